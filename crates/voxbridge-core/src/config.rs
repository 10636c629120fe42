//! TOML configuration for the synthesis core.

use crate::engine::{build_engine, EngineSpec, SpeechEngine};
use crate::error::{VoxError, VoxResult};
use crate::params::SystemDefaults;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Streaming settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Bounded sink capacity in chunks
    pub channel_capacity: usize,
    /// Chunk size hint in bytes passed to engines
    pub default_chunk_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1,
            default_chunk_size: crate::DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Settings shared by network engines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// User agent header
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("voxbridge/{}", crate::VERSION),
        }
    }
}

/// Validation workflow settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Status code counted as success
    pub success_status: u16,
    /// Upper bound for one validation round trip in seconds
    pub timeout_secs: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            success_status: 200,
            timeout_secs: 60,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoxConfig {
    /// Ambient rate/pitch used when an engine follows the system
    pub system: SystemDefaults,
    /// Streaming settings
    pub stream: StreamConfig,
    /// Network engine settings
    pub http: HttpConfig,
    /// Validation settings
    pub validation: ValidationConfig,
    /// Configured engines
    pub engines: Vec<EngineSpec>,
}

impl VoxConfig {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// Returns a configuration error if parsing or validation fails.
    pub fn from_toml_str(content: &str) -> VoxResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or is invalid.
    pub fn load<P: AsRef<Path>>(path: P) -> VoxResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VoxError::configuration(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!(
            "Loaded configuration from {} ({} engines)",
            path.display(),
            config.engines.len()
        );
        Ok(config)
    }

    /// Load from [`default_config_path`], falling back to defaults when absent
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file exists but is invalid.
    pub fn load_default() -> VoxResult<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first invalid value.
    pub fn validate(&self) -> VoxResult<()> {
        if self.stream.channel_capacity == 0 {
            return Err(VoxError::configuration(
                "stream.channel_capacity must be greater than 0",
            ));
        }
        if self.http.timeout_secs == 0 {
            return Err(VoxError::configuration(
                "http.timeout_secs must be greater than 0",
            ));
        }
        if self.validation.timeout_secs == 0 {
            return Err(VoxError::configuration(
                "validation.timeout_secs must be greater than 0",
            ));
        }
        if !(100..=599).contains(&self.validation.success_status) {
            return Err(VoxError::configuration(format!(
                "validation.success_status {} is not an HTTP status",
                self.validation.success_status
            )));
        }
        for (index, spec) in self.engines.iter().enumerate() {
            let sample_rate = spec.config().audio_format.sample_rate;
            if !(crate::MIN_SAMPLE_RATE..=crate::MAX_SAMPLE_RATE).contains(&sample_rate) {
                return Err(VoxError::configuration(format!(
                    "engines[{index}].audio_format.sample_rate {sample_rate} is outside {}..={} Hz",
                    crate::MIN_SAMPLE_RATE,
                    crate::MAX_SAMPLE_RATE
                )));
            }
        }
        Ok(())
    }

    /// Build every configured engine
    ///
    /// # Errors
    ///
    /// Returns the first engine construction error.
    pub fn build_engines(&self) -> VoxResult<Vec<Box<dyn SpeechEngine>>> {
        self.engines
            .iter()
            .map(|spec| build_engine(spec, self))
            .collect()
    }
}

/// `<platform config dir>/voxbridge/config.toml`
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "voxbridge")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_format::AudioCodec;
    use crate::engine::HttpMethod;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[system]
rate = 65
pitch = 45

[stream]
channel_capacity = 4

[[engines]]
type = "http"

[engines.config]
rate = 0
pitch = 60
volume = 80

[engines.config.audio_format]
codec = "mp3"
sample_rate = 24000

[engines.request]
url = "http://tts.local/api?text={{text}}"
method = "POST"
body = "{{text}}"

[engines.request.headers]
Authorization = "Bearer token"

[[engines]]
type = "command"

[engines.command]
program = "espeak-ng"
args = ["-s", "{{rate}}", "{{text}}"]

[[engines]]
type = "tone"
"#;

    #[test]
    fn test_default_config() {
        let config = VoxConfig::default();
        assert_eq!(config.system, SystemDefaults::default());
        assert_eq!(config.stream.channel_capacity, 1);
        assert_eq!(config.stream.default_chunk_size, crate::DEFAULT_CHUNK_SIZE);
        assert_eq!(config.validation.success_status, 200);
        assert!(config.engines.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_sample() {
        let config = VoxConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.system.rate, 65);
        assert_eq!(config.stream.channel_capacity, 4);
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.engines.len(), 3);

        match &config.engines[0] {
            EngineSpec::Http { config, request } => {
                assert!(config.params.is_rate_following_system());
                assert_eq!(config.params.pitch, 60);
                assert_eq!(config.audio_format.codec, AudioCodec::Mp3);
                assert_eq!(request.method, HttpMethod::Post);
                assert_eq!(request.headers["Authorization"], "Bearer token");
            }
            other => panic!("expected http engine, got {other:?}"),
        }
        assert!(matches!(config.engines[2], EngineSpec::Tone { .. }));

        let engines = config.build_engines().unwrap();
        let tags: Vec<_> = engines.iter().map(|e| e.type_tag()).collect();
        assert_eq!(tags, vec!["http", "command", "tone"]);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(VoxConfig::from_toml_str("[stream]\nchannel_capacity = 0").is_err());
        assert!(VoxConfig::from_toml_str("[validation]\nsuccess_status = 42").is_err());
        assert!(VoxConfig::from_toml_str("[[engines]]\ntype = \"carrier-pigeon\"").is_err());
    }

    #[test]
    fn test_engine_sample_rate_bounded() {
        let engine = |rate: u32| {
            format!("[[engines]]\ntype = \"tone\"\n[engines.config.audio_format]\nsample_rate = {rate}\n")
        };
        assert!(VoxConfig::from_toml_str(&engine(48_000)).is_ok());

        let err = VoxConfig::from_toml_str(&engine(4_000_000_000)).unwrap_err();
        assert!(matches!(err, VoxError::ConfigurationError { .. }));
        assert!(err.to_string().contains("engines[0].audio_format.sample_rate"));
        assert!(VoxConfig::from_toml_str(&engine(0)).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = VoxConfig::load(file.path()).unwrap();
        assert_eq!(config.engines.len(), 3);

        let missing = VoxConfig::load(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(VoxError::ConfigurationError { .. })));
    }
}
