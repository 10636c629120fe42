//! Offline engine rendering one tone per character.
//!
//! Useful for exercising the pipeline without a network backend. Buffer mode
//! returns 16-bit mono WAV, stream mode returns the same samples as raw
//! little-endian PCM.

use super::SpeechEngine;
use crate::descriptors::EngineConfig;
use crate::error::{VoxError, VoxResult};
use crate::params::ResolvedParams;
use crate::stream::ChunkSink;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::io::Cursor;
use tracing::debug;

/// Rate and pitch value that maps to the base tone length and frequency
const NEUTRAL: f32 = 50.0;
const BASE_TONE_MS: f32 = 120.0;
const BASE_FREQUENCY: f32 = 220.0;

/// Longest utterance one call may render
const MAX_RENDER_SECS: u64 = 300;

/// Per-call tone settings derived from the sample rate and resolved params
#[derive(Debug, Clone, Copy)]
struct ToneShape {
    sample_rate: f32,
    tone_len: usize,
    pitch: f32,
    amplitude: f32,
}

impl ToneShape {
    fn tone(self, c: char) -> impl Iterator<Item = i16> {
        let frequency = if c.is_whitespace() {
            0.0
        } else {
            let step = (u32::from(c) % 24) as f32;
            BASE_FREQUENCY * 2f32.powf(step / 12.0) * self.pitch
        };
        (0..self.tone_len).map(move |n| {
            let t = n as f32 / self.sample_rate;
            (self.amplitude * (std::f32::consts::TAU * frequency * t).sin()) as i16
        })
    }
}

/// Engine rendering deterministic tones from text
#[derive(Debug, Default)]
pub struct ToneEngine {
    config: EngineConfig,
}

impl ToneEngine {
    /// Create a tone engine; output sample rate comes from the audio format
    #[must_use]
    pub const fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    fn sample_rate(&self) -> u32 {
        self.config
            .audio_format
            .sample_rate
            .clamp(crate::MIN_SAMPLE_RATE, crate::MAX_SAMPLE_RATE)
    }

    /// Apply the speech rule and size the render, refusing oversized output
    fn prepare(&self, text: &str, params: &ResolvedParams) -> VoxResult<(String, ToneShape)> {
        let text = self.config.speech_rule.apply(text);
        if text.trim().is_empty() {
            return Err(VoxError::invalid_input("nothing to synthesize"));
        }

        let sample_rate = self.sample_rate();
        let speed = (params.rate.max(1) as f32 / NEUTRAL).clamp(0.25, 4.0);
        let shape = ToneShape {
            sample_rate: sample_rate as f32,
            tone_len: (sample_rate as f32 * BASE_TONE_MS / 1000.0 / speed) as usize,
            pitch: (params.pitch.max(1) as f32 / NEUTRAL).clamp(0.25, 4.0),
            amplitude: (params.volume.clamp(0, 100) as f32 / 100.0) * f32::from(i16::MAX) * 0.5,
        };

        let limit = u64::from(sample_rate) * MAX_RENDER_SECS;
        let total = (shape.tone_len as u64).saturating_mul(text.chars().count() as u64);
        if total > limit {
            return Err(VoxError::invalid_input(format!(
                "text would render {total} samples, limit is {limit} ({MAX_RENDER_SECS}s at {sample_rate} Hz)"
            )));
        }
        Ok((text, shape))
    }

    fn encode_wav(&self, text: &str, shape: ToneShape) -> VoxResult<Bytes> {
        let spec = hound::WavSpec {
            channels: crate::DEFAULT_CHANNELS,
            sample_rate: self.sample_rate(),
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let samples = shape.tone_len * text.chars().count();
        let mut cursor = Cursor::new(Vec::with_capacity(44 + samples * 2));
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| VoxError::invalid_input(format!("Failed to start WAV: {e}")))?;
        for sample in text.chars().flat_map(|c| shape.tone(c)) {
            writer
                .write_sample(sample)
                .map_err(|e| VoxError::invalid_input(format!("Failed to write WAV: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| VoxError::invalid_input(format!("Failed to finalize WAV: {e}")))?;
        debug!("Tone engine rendered {} samples", samples);
        Ok(Bytes::from(cursor.into_inner()))
    }
}

#[async_trait]
impl SpeechEngine for ToneEngine {
    fn type_tag(&self) -> &'static str {
        "tone"
    }

    fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn synthesize_buffer(&self, text: &str, params: &ResolvedParams) -> VoxResult<Bytes> {
        let (text, shape) = self.prepare(text, params)?;
        self.encode_wav(&text, shape)
    }

    async fn synthesize_stream(
        &self,
        text: &str,
        params: &ResolvedParams,
        chunk_size_hint: usize,
        sink: &mut ChunkSink,
    ) -> VoxResult<()> {
        let (text, shape) = self.prepare(text, params)?;
        let chunk_size = if chunk_size_hint == 0 {
            crate::DEFAULT_CHUNK_SIZE
        } else {
            // keep samples whole
            chunk_size_hint.saturating_add(1) & !1
        };

        // Render one character at a time; at most a chunk plus one tone is buffered
        let mut pending = BytesMut::new();
        for c in text.chars() {
            for sample in shape.tone(c) {
                pending.extend_from_slice(&sample.to_le_bytes());
            }
            while pending.len() >= chunk_size {
                sink.send(pending.split_to(chunk_size).freeze()).await?;
                tokio::task::yield_now().await;
            }
        }
        if !pending.is_empty() {
            sink.send(pending.freeze()).await?;
        }
        Ok(())
    }
}
