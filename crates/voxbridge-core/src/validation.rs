//! End-to-end engine validation.
//!
//! [`ValidationWorkflow::validate`] issues one raw request through the
//! engine, then classifies the reply. Engines without a raw transport are
//! validated through the pipeline's buffer path instead. Every failure,
//! including transport errors and timeouts, comes back as a
//! [`ValidationOutcome`] value.

use crate::config::VoxConfig;
use crate::engine::{describe_body, SpeechEngine, TransportResponse};
use crate::error::{FailureKind, VoxError, VoxResult};
use crate::params::ParameterResolver;
use crate::pipeline::{validate_text, SynthesisPipeline};
use crate::probe::{probe, ProbedFormat};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Content type reported when the backend sends none
pub const UNKNOWN_CONTENT_TYPE: &str = "unknown";

/// Why a validation run failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// Failure class
    pub kind: FailureKind,
    /// Human-readable detail
    pub message: String,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<VoxError> for ValidationFailure {
    fn from(err: VoxError) -> Self {
        Self {
            kind: err.failure_kind(),
            message: err.to_string(),
        }
    }
}

/// Report produced by one validation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Whether playable audio came back
    pub success: bool,
    /// Audio returned by the engine
    pub audio: Option<Bytes>,
    /// Probed sample rate
    pub sample_rate: Option<u32>,
    /// Probed MIME type
    pub mime: Option<String>,
    /// Content type declared by the backend
    pub content_type: Option<String>,
    /// Failure detail when `success` is false
    pub failure: Option<ValidationFailure>,
}

impl ValidationOutcome {
    fn succeeded(audio: Bytes, format: ProbedFormat, content_type: String) -> Self {
        Self {
            success: true,
            audio: Some(audio),
            sample_rate: Some(format.sample_rate),
            mime: Some(format.mime().to_string()),
            content_type: Some(content_type),
            failure: None,
        }
    }

    pub(crate) fn failed(failure: ValidationFailure) -> Self {
        Self {
            success: false,
            audio: None,
            sample_rate: None,
            mime: None,
            content_type: None,
            failure: Some(failure),
        }
    }

    /// Failure class, if any
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure.as_ref().map(|failure| failure.kind)
    }

    /// JSON report without the audio payload
    ///
    /// # Errors
    ///
    /// Returns a configuration error if serialization fails.
    pub fn to_json(&self) -> VoxResult<String> {
        let report = serde_json::json!({
            "success": self.success,
            "audio_bytes": self.audio.as_ref().map(Bytes::len),
            "sample_rate": self.sample_rate,
            "mime": self.mime,
            "content_type": self.content_type,
            "failure": self.failure,
        });
        Ok(serde_json::to_string_pretty(&report)?)
    }
}

/// Validation settings and entry point
#[derive(Debug, Clone, Copy)]
pub struct ValidationWorkflow {
    pipeline: SynthesisPipeline,
    success_status: u16,
    timeout: Duration,
}

impl Default for ValidationWorkflow {
    fn default() -> Self {
        Self::from_config(&VoxConfig::default())
    }
}

impl ValidationWorkflow {
    /// Create a workflow
    #[must_use]
    pub fn new(resolver: ParameterResolver, success_status: u16, timeout: Duration) -> Self {
        Self {
            pipeline: SynthesisPipeline::new(resolver, 1),
            success_status,
            timeout,
        }
    }

    /// Create a workflow from configuration
    #[must_use]
    pub fn from_config(config: &VoxConfig) -> Self {
        Self {
            pipeline: SynthesisPipeline::from_config(config),
            success_status: config.validation.success_status,
            timeout: Duration::from_secs(config.validation.timeout_secs),
        }
    }

    /// Run one request through `engine` and classify the reply.
    ///
    /// Falls back to buffer synthesis when the engine has no raw transport
    /// and does not play audio itself; that reply counts as the success
    /// status with an unknown content type. Never fails; every error is
    /// reported in the outcome.
    pub async fn validate(&self, engine: &dyn SpeechEngine, text: &str) -> ValidationOutcome {
        match self.run(engine, text).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("Validation of {} engine failed: {}", engine.type_tag(), err);
                ValidationOutcome::failed(err.into())
            }
        }
    }

    async fn run(&self, engine: &dyn SpeechEngine, text: &str) -> VoxResult<ValidationOutcome> {
        validate_text(text)?;
        let params = self.pipeline.resolve(engine);

        debug!("Validating {} engine", engine.type_tag());
        let response = match self.within_timeout(engine.fetch_response(text, &params)).await {
            Err(VoxError::UnsupportedOperation { .. }) if !engine.is_direct_play() => {
                debug!(
                    "{} engine has no raw transport, validating its buffer output",
                    engine.type_tag()
                );
                let audio = self
                    .within_timeout(self.pipeline.buffer(engine, text, &params))
                    .await?;
                TransportResponse {
                    status: self.success_status,
                    body: Some(audio).filter(|audio| !audio.is_empty()),
                    content_type: None,
                }
            }
            other => other?,
        };

        if response.status != self.success_status {
            return Err(VoxError::server(
                response.status,
                describe_body(response.body.as_deref()),
            ));
        }
        let audio = response
            .body
            .ok_or_else(|| VoxError::empty_audio("Response body is empty"))?;

        let content_type = response
            .content_type
            .unwrap_or_else(|| UNKNOWN_CONTENT_TYPE.to_string());
        let probe_input = audio.clone();
        let format = tokio::task::spawn_blocking(move || probe(&probe_input))
            .await
            .map_err(|e| VoxError::unrecognized_format(format!("Probe task failed: {e}")))??;

        info!(
            "Validated {} engine: {} bytes, {} Hz, {}",
            engine.type_tag(),
            audio.len(),
            format.sample_rate,
            format.mime()
        );
        Ok(ValidationOutcome::succeeded(audio, format, content_type))
    }

    async fn within_timeout<T>(&self, call: impl Future<Output = VoxResult<T>>) -> VoxResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(VoxError::transport(format!(
                "No response within {}s",
                self.timeout.as_secs_f32()
            ))),
        }
    }
}
