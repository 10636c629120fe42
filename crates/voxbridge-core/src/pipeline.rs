//! Synthesis routing: direct play, whole-buffer and streaming.
//!
//! The pipeline resolves the engine's rate and pitch, then picks exactly one
//! path. Direct-play engines never reach the buffer or stream entry points.
//! Engine errors are returned unchanged; the pipeline does not retry and does
//! not probe formats.

use crate::config::VoxConfig;
use crate::engine::SpeechEngine;
use crate::error::{VoxError, VoxResult};
use crate::params::{ParameterResolver, ResolvedParams};
use crate::stream::{ChunkSink, StreamEvent, SynthesisStream};
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::{mpsc, OwnedRwLockReadGuard, RwLock};
use tracing::{debug, info, warn};

/// Engine handle shared between a session, the pipeline and stream tasks
pub type SharedEngine = Arc<RwLock<Box<dyn SpeechEngine>>>;

/// Wrap an engine for use with the pipeline
#[must_use]
pub fn share(engine: Box<dyn SpeechEngine>) -> SharedEngine {
    Arc::new(RwLock::new(engine))
}

/// Requested output shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisMode {
    /// One complete buffer
    Buffer,
    /// Ordered chunks; `chunk_size_hint` of 0 lets the engine choose
    Stream {
        /// Advisory chunk size in bytes
        chunk_size_hint: usize,
    },
}

/// Result of one synthesis call
#[derive(Debug)]
pub enum SynthesisOutput {
    /// Complete audio
    Buffer(Bytes),
    /// Chunks arriving from a background task
    Stream(SynthesisStream),
    /// The engine played the audio itself
    Played,
}

impl SynthesisOutput {
    /// Buffer payload, if this is a buffer result
    #[must_use]
    pub fn into_buffer(self) -> Option<Bytes> {
        match self {
            Self::Buffer(audio) => Some(audio),
            _ => None,
        }
    }

    /// Stream handle, if this is a stream result
    #[must_use]
    pub fn into_stream(self) -> Option<SynthesisStream> {
        match self {
            Self::Stream(stream) => Some(stream),
            _ => None,
        }
    }
}

/// Routes synthesis calls into an engine
#[derive(Debug, Clone, Copy)]
pub struct SynthesisPipeline {
    resolver: ParameterResolver,
    channel_capacity: usize,
    default_chunk_size: usize,
}

impl Default for SynthesisPipeline {
    fn default() -> Self {
        Self::new(ParameterResolver::default(), 1)
    }
}

impl SynthesisPipeline {
    /// Create a pipeline with a bounded stream capacity (at least 1)
    #[must_use]
    pub fn new(resolver: ParameterResolver, channel_capacity: usize) -> Self {
        Self {
            resolver,
            channel_capacity: channel_capacity.max(1),
            default_chunk_size: crate::DEFAULT_CHUNK_SIZE,
        }
    }

    /// Create a pipeline from configuration
    #[must_use]
    pub fn from_config(config: &VoxConfig) -> Self {
        Self {
            default_chunk_size: config.stream.default_chunk_size,
            ..Self::new(ParameterResolver::new(config.system), config.stream.channel_capacity)
        }
    }

    /// Stream mode using the configured chunk size
    #[must_use]
    pub const fn stream_mode(&self) -> SynthesisMode {
        SynthesisMode::Stream {
            chunk_size_hint: self.default_chunk_size,
        }
    }

    /// Resolver used for rate and pitch
    #[must_use]
    pub const fn resolver(&self) -> &ParameterResolver {
        &self.resolver
    }

    /// Effective parameters for `engine`
    #[must_use]
    pub fn resolve(&self, engine: &dyn SpeechEngine) -> ResolvedParams {
        self.resolver.resolve(&engine.config().params)
    }

    /// Synthesize `text` with `engine`.
    ///
    /// # Errors
    ///
    /// Returns [`VoxError::InvalidInput`] for empty or oversized text,
    /// [`VoxError::PlaybackFailed`] when direct play reports failure, and
    /// the engine's own error unchanged for buffer synthesis. Stream errors
    /// arrive as [`StreamEvent::Failed`].
    pub async fn synthesize(
        &self,
        engine: &SharedEngine,
        text: &str,
        mode: SynthesisMode,
    ) -> VoxResult<SynthesisOutput> {
        validate_text(text)?;

        // Owned so a stream task can keep the engine alive past this call
        let guard = Arc::clone(engine).read_owned().await;
        let params = self.resolve(&**guard);

        if guard.is_direct_play() {
            debug!("Routing to direct play on {} engine", guard.type_tag());
            return if guard.start_direct_play(text, &params).await {
                Ok(SynthesisOutput::Played)
            } else {
                warn!("{} engine failed to play", guard.type_tag());
                Err(VoxError::playback(format!(
                    "{} engine did not play the text",
                    guard.type_tag()
                )))
            };
        }

        match mode {
            SynthesisMode::Buffer => Ok(SynthesisOutput::Buffer(
                self.buffer(&**guard, text, &params).await?,
            )),
            SynthesisMode::Stream { chunk_size_hint } => Ok(SynthesisOutput::Stream(
                self.spawn_stream(guard, text, params, chunk_size_hint),
            )),
        }
    }

    /// Buffer path on an engine the caller already holds
    pub(crate) async fn buffer(
        &self,
        engine: &dyn SpeechEngine,
        text: &str,
        params: &ResolvedParams,
    ) -> VoxResult<Bytes> {
        let audio = engine.synthesize_buffer(text, params).await?;
        debug!("{} engine returned {} bytes", engine.type_tag(), audio.len());
        Ok(audio)
    }

    fn spawn_stream(
        &self,
        guard: OwnedRwLockReadGuard<Box<dyn SpeechEngine>>,
        text: &str,
        params: ResolvedParams,
        chunk_size_hint: usize,
    ) -> SynthesisStream {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let text = text.to_string();

        let task = tokio::spawn(async move {
            let mut sink = ChunkSink::new(tx.clone());
            let terminal = match guard
                .synthesize_stream(&text, &params, chunk_size_hint, &mut sink)
                .await
            {
                Ok(()) => {
                    info!(
                        "{} engine streamed {} chunks",
                        guard.type_tag(),
                        sink.chunks_sent()
                    );
                    StreamEvent::End
                }
                Err(err) => {
                    warn!("{} engine stream failed: {}", guard.type_tag(), err);
                    StreamEvent::Failed(err)
                }
            };
            if tx.send(terminal).await.is_err() {
                debug!("Stream consumer left before the terminal event");
            }
        });

        SynthesisStream::new(rx, task)
    }
}

pub(crate) fn validate_text(text: &str) -> VoxResult<()> {
    if text.trim().is_empty() {
        return Err(VoxError::invalid_input("Text cannot be empty"));
    }
    let length = text.chars().count();
    if length > crate::MAX_TEXT_LENGTH {
        return Err(VoxError::invalid_input(format!(
            "Text length {} exceeds maximum of {}",
            length,
            crate::MAX_TEXT_LENGTH
        )));
    }
    Ok(())
}
