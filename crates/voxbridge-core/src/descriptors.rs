//! Configuration descriptors owned by an engine instance.

use crate::audio_format::AudioCodec;
use crate::params::SpeechParameters;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Rule metadata an engine applies to input text before synthesis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechRule {
    /// Rule tag this engine is bound to (e.g. `dialogue`, `narration`)
    pub tag: Option<String>,
    /// Human-readable tag name
    pub tag_name: String,
    /// Engine is a standby for its tag
    pub is_standby: bool,
    /// Characters removed from the text before synthesis
    pub strip_chars: String,
    /// Collapse whitespace runs into single spaces
    pub collapse_whitespace: bool,
}

impl SpeechRule {
    /// Transform input text according to this rule
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        let normalized: String = text
            .nfc()
            .filter(|c| !self.strip_chars.contains(*c))
            .collect();

        if self.collapse_whitespace {
            normalized.split_whitespace().collect::<Vec<_>>().join(" ")
        } else {
            normalized
        }
    }
}

/// Declared output encoding of an engine.
///
/// Advisory only: the probe is authoritative when the backend's
/// declaration is absent or wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioFormatDescriptor {
    /// Container or codec hint
    pub codec: AudioCodec,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Bit rate in kbps for compressed codecs
    pub bit_rate: Option<u32>,
}

impl Default for AudioFormatDescriptor {
    fn default() -> Self {
        Self {
            codec: AudioCodec::Mp3,
            sample_rate: crate::DEFAULT_SAMPLE_RATE,
            bit_rate: None,
        }
    }
}

impl AudioFormatDescriptor {
    /// Create a descriptor without a bit rate
    #[must_use]
    pub const fn new(codec: AudioCodec, sample_rate: u32) -> Self {
        Self {
            codec,
            sample_rate,
            bit_rate: None,
        }
    }

    /// Whether the declared output needs decoding before PCM playback
    #[must_use]
    pub const fn needs_decode(&self) -> bool {
        self.codec.needs_decode()
    }
}

impl std::fmt::Display for AudioFormatDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}Hz | {}", self.sample_rate, self.codec)?;
        if let Some(bit_rate) = self.bit_rate {
            write!(f, " | {bit_rate}kbps")?;
        }
        if self.needs_decode() {
            write!(f, " | decode")?;
        }
        Ok(())
    }
}

/// Playback routing hints, passed through to whoever plays the audio
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerParams {
    /// Output stream or device name
    pub output_stream: Option<String>,
    /// Player-side rate multiplier, zero for the global default
    pub rate: f32,
    /// Player-side volume multiplier, zero for the global default
    pub volume: f32,
    /// Player-side pitch multiplier, zero for the global default
    pub pitch: f32,
}

/// Everything an engine instance owns for its lifetime
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rate, pitch and volume
    #[serde(flatten)]
    pub params: SpeechParameters,
    /// Text rule applied before synthesis
    pub speech_rule: SpeechRule,
    /// Declared output format
    pub audio_format: AudioFormatDescriptor,
    /// Playback routing hints
    pub player: PlayerParams,
}
