//! Engine lifecycle around pipeline use.
//!
//! An [`EngineSession`] owns one engine and walks it through
//! `Created -> Loaded -> Destroyed`. `on_load` runs before first use,
//! `on_destroy` runs exactly once, and `stop` may be called at any time.
//! State transitions happen only while the engine write lock is held, so
//! concurrent callers never observe a half-loaded engine.

use crate::config::VoxConfig;
use crate::description::Localizer;
use crate::engine::SpeechEngine;
use crate::error::{VoxError, VoxResult};
use crate::pipeline::{share, SharedEngine, SynthesisMode, SynthesisOutput, SynthesisPipeline};
use crate::validation::{ValidationOutcome, ValidationWorkflow};
use parking_lot::Mutex;
use std::fmt;
use tracing::{debug, info, warn};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Engine constructed, `on_load` not yet called
    Created,
    /// `on_load` succeeded
    Loaded,
    /// `on_destroy` has run
    Destroyed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Loaded => write!(f, "loaded"),
            Self::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// One engine plus the machinery to drive it
pub struct EngineSession {
    engine: SharedEngine,
    type_tag: &'static str,
    state: Mutex<SessionState>,
    pipeline: SynthesisPipeline,
    validation: ValidationWorkflow,
}

impl fmt::Debug for EngineSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSession")
            .field("type_tag", &self.type_tag)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl EngineSession {
    /// Wrap `engine` using pipeline and validation settings from `config`
    #[must_use]
    pub fn new(engine: Box<dyn SpeechEngine>, config: &VoxConfig) -> Self {
        Self::with_parts(
            engine,
            SynthesisPipeline::from_config(config),
            ValidationWorkflow::from_config(config),
        )
    }

    /// Wrap `engine` with explicit pipeline and validation settings
    #[must_use]
    pub fn with_parts(
        engine: Box<dyn SpeechEngine>,
        pipeline: SynthesisPipeline,
        validation: ValidationWorkflow,
    ) -> Self {
        let type_tag = engine.type_tag();
        Self {
            engine: share(engine),
            type_tag,
            state: Mutex::new(SessionState::Created),
            pipeline,
            validation,
        }
    }

    /// Engine type tag
    #[must_use]
    pub const fn type_tag(&self) -> &'static str {
        self.type_tag
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Shared engine handle
    #[must_use]
    pub const fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    /// Call `on_load` if it has not run yet
    ///
    /// # Errors
    ///
    /// Returns the engine's load error, or a lifecycle error after destroy.
    pub async fn load(&self) -> VoxResult<()> {
        if self.state() == SessionState::Loaded {
            return Ok(());
        }

        let mut engine = self.engine.write().await;
        match self.state() {
            SessionState::Loaded => return Ok(()),
            SessionState::Destroyed => return Err(self.destroyed_error()),
            SessionState::Created => {}
        }
        engine.on_load().await?;
        *self.state.lock() = SessionState::Loaded;
        info!("Loaded {} engine", self.type_tag);
        Ok(())
    }

    /// Synthesize `text`, loading the engine first if needed
    ///
    /// # Errors
    ///
    /// Returns lifecycle errors and everything [`SynthesisPipeline::synthesize`] returns.
    pub async fn synthesize(&self, text: &str, mode: SynthesisMode) -> VoxResult<SynthesisOutput> {
        self.load().await?;
        self.pipeline.synthesize(&self.engine, text, mode).await
    }

    /// Synthesize into one buffer
    ///
    /// # Errors
    ///
    /// See [`EngineSession::synthesize`].
    pub async fn synthesize_buffer(&self, text: &str) -> VoxResult<bytes::Bytes> {
        match self.synthesize(text, SynthesisMode::Buffer).await? {
            SynthesisOutput::Buffer(audio) => Ok(audio),
            SynthesisOutput::Played => Err(VoxError::unsupported(format!(
                "{} engine plays directly and returns no audio",
                self.type_tag
            ))),
            SynthesisOutput::Stream(_) => Err(VoxError::unsupported("unexpected stream output")),
        }
    }

    /// Stream mode with the configured chunk size
    #[must_use]
    pub const fn stream_mode(&self) -> SynthesisMode {
        self.pipeline.stream_mode()
    }

    /// Validate the engine end to end, loading it first if needed
    pub async fn validate(&self, text: &str) -> ValidationOutcome {
        if let Err(err) = self.load().await {
            return ValidationOutcome::failed(err.into());
        }
        let engine = self.engine.read().await;
        self.validation.validate(&**engine, text).await
    }

    /// Interrupt playback. Safe to call any number of times, in any state.
    pub async fn stop(&self) {
        if self.state() != SessionState::Loaded {
            debug!("Stop on {} session ignored", self.state());
            return;
        }
        self.engine.read().await.on_stop().await;
        debug!("Stopped {} engine", self.type_tag);
    }

    /// Stop, then call `on_destroy` exactly once.
    ///
    /// Waits for in-flight synthesis and open streams to release the engine.
    /// Later calls are no-ops.
    pub async fn destroy(&self) {
        if self.state() == SessionState::Destroyed {
            return;
        }
        self.stop().await;

        let mut engine = self.engine.write().await;
        if self.state() == SessionState::Destroyed {
            return;
        }
        engine.on_destroy().await;
        *self.state.lock() = SessionState::Destroyed;
        info!("Destroyed {} engine", self.type_tag);
    }

    /// Parameter description rendered through `localizer`
    pub async fn description(&self, localizer: &dyn Localizer) -> String {
        self.engine.read().await.description(localizer)
    }

    /// Format line for the engine's declared audio format
    pub async fn bottom_content(&self) -> String {
        self.engine.read().await.bottom_content()
    }

    fn destroyed_error(&self) -> VoxError {
        VoxError::lifecycle(format!("{} engine has been destroyed", self.type_tag))
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        if *self.state.get_mut() != SessionState::Destroyed {
            warn!("{} engine session dropped without destroy", self.type_tag);
        }
    }
}
