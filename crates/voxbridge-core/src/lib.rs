//! # Voxbridge Core
//!
//! One text-to-speech contract over heterogeneous speech engines.
//!
//! ## Features
//!
//! - Network, direct-play and offline engines behind one [`SpeechEngine`] trait
//! - Rate and pitch that can follow the system default
//! - Whole-buffer and chunked streaming synthesis
//! - Header-based audio format probing (WAV, MP3, AAC, FLAC, Ogg/Opus)
//! - End-to-end engine validation with a structured failure taxonomy
//!
//! ## Example
//!
//! ```rust,no_run
//! use voxbridge_core::{EngineSession, StreamEvent, ToneEngine, VoxConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = VoxConfig::default();
//!     let session = EngineSession::new(Box::new(ToneEngine::default()), &config);
//!
//!     let audio = session.synthesize_buffer("Hello, world!").await?;
//!     println!("{} bytes", audio.len());
//!
//!     let output = session.synthesize("Hello again", session.stream_mode()).await?;
//!     if let Some(mut stream) = output.into_stream() {
//!         while let Some(event) = stream.next_event().await {
//!             if let StreamEvent::Chunk(chunk) = event {
//!                 println!("chunk of {} bytes", chunk.len());
//!             }
//!         }
//!     }
//!
//!     session.destroy().await;
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod audio_format;
pub mod config;
pub mod description;
pub mod descriptors;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod params;
pub mod pipeline;
pub mod probe;
pub mod stream;
pub mod validation;

// Re-export main types for convenience
pub use audio_format::AudioCodec;
pub use config::{default_config_path, VoxConfig};
pub use description::{describe_params, EnglishLocalizer, Localizer};
pub use descriptors::{AudioFormatDescriptor, EngineConfig, PlayerParams, SpeechRule};
pub use engine::{
    build_engine, CommandEngine, EngineSpec, HttpEngine, SpeechEngine, ToneEngine,
    TransportResponse,
};
pub use error::{FailureKind, VoxError, VoxResult};
pub use lifecycle::{EngineSession, SessionState};
pub use params::{
    is_following_system, ParameterResolver, ResolvedParams, SpeechParameters, SystemDefaults,
    FOLLOW_SYSTEM,
};
pub use pipeline::{SharedEngine, SynthesisMode, SynthesisOutput, SynthesisPipeline};
pub use probe::{probe, ProbedFormat};
pub use stream::{ChunkSink, StreamEvent, SynthesisStream};
pub use validation::{ValidationFailure, ValidationOutcome, ValidationWorkflow};

/// Version information for the voxbridge-core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Sample rate assumed when an engine declares none (24 kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Default number of audio channels (mono)
pub const DEFAULT_CHANNELS: u16 = 1;

/// Chunk size hint used when none is configured
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Maximum text length for synthesis (to prevent memory issues)
pub const MAX_TEXT_LENGTH: usize = 100_000;

/// Lowest sample rate an engine may declare
pub const MIN_SAMPLE_RATE: u32 = 8_000;

/// Highest sample rate an engine may declare
pub const MAX_SAMPLE_RATE: u32 = 192_000;
