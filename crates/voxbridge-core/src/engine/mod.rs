//! The speech engine contract and its concrete variants.
//!
//! Every engine implements [`SpeechEngine`]. Each overridable capability has
//! a documented default, so a variant only overrides the modes it supports
//! and callers never need to know which variant they hold.

use crate::description::{describe_params, Localizer};
use crate::descriptors::EngineConfig;
use crate::error::{VoxError, VoxResult};
use crate::params::ResolvedParams;
use crate::stream::ChunkSink;
use async_trait::async_trait;
use bytes::Bytes;

pub mod command;
pub mod factory;
pub mod http;
pub mod tone;

pub use command::{CommandEngine, CommandTemplate};
pub use factory::{build_engine, EngineSpec};
pub use http::{HttpEngine, HttpMethod, HttpRequestTemplate};
pub use tone::ToneEngine;

/// Raw transport reply used by the validation workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// Status code analog
    pub status: u16,
    /// Response body, `None` when absent or empty
    pub body: Option<Bytes>,
    /// Content-type header analog
    pub content_type: Option<String>,
}

/// Capability set implemented by every speech engine
#[async_trait]
pub trait SpeechEngine: Send + Sync + std::fmt::Debug {
    /// Short type tag shown next to the engine (e.g. `http`)
    fn type_tag(&self) -> &'static str;

    /// Configuration owned by this instance
    fn config(&self) -> &EngineConfig;

    /// Whether the configured rate follows the system default
    fn is_rate_follow_system(&self) -> bool {
        self.config().params.is_rate_following_system()
    }

    /// Whether the configured pitch follows the system default
    fn is_pitch_follow_system(&self) -> bool {
        self.config().params.is_pitch_following_system()
    }

    /// Format line derived from the declared audio format
    fn bottom_content(&self) -> String {
        self.config().audio_format.to_string()
    }

    /// Rate/volume/pitch description rendered through `localizer`
    fn description(&self, localizer: &dyn Localizer) -> String {
        describe_params(&self.config().params, localizer)
    }

    /// Whether this engine plays audio itself instead of returning bytes.
    ///
    /// Defaults to `false`.
    fn is_direct_play(&self) -> bool {
        false
    }

    /// Acquire backend resources. Defaults to a no-op.
    async fn on_load(&mut self) -> VoxResult<()> {
        Ok(())
    }

    /// Interrupt any in-flight playback. Idempotent; defaults to a no-op.
    async fn on_stop(&self) {}

    /// Release backend resources. Defaults to a no-op.
    async fn on_destroy(&mut self) {}

    /// Play `text` directly. Returns `true` on success.
    ///
    /// Defaults to `false` (not supported).
    async fn start_direct_play(&self, _text: &str, _params: &ResolvedParams) -> bool {
        false
    }

    /// Synthesize the whole utterance into one buffer.
    ///
    /// Defaults to [`VoxError::UnsupportedOperation`].
    async fn synthesize_buffer(&self, _text: &str, _params: &ResolvedParams) -> VoxResult<Bytes> {
        Err(VoxError::unsupported(format!(
            "{} engine does not support buffer synthesis",
            self.type_tag()
        )))
    }

    /// Stream the utterance as chunks into `sink`.
    ///
    /// `chunk_size_hint` is advisory. The end-of-stream signal is emitted by
    /// the pipeline after this returns. Defaults to completing immediately
    /// without emitting anything.
    async fn synthesize_stream(
        &self,
        _text: &str,
        _params: &ResolvedParams,
        _chunk_size_hint: usize,
        _sink: &mut ChunkSink,
    ) -> VoxResult<()> {
        Ok(())
    }

    /// Issue one raw request and return status, body and content type.
    ///
    /// Defaults to [`VoxError::UnsupportedOperation`].
    async fn fetch_response(
        &self,
        _text: &str,
        _params: &ResolvedParams,
    ) -> VoxResult<TransportResponse> {
        Err(VoxError::unsupported(format!(
            "{} engine has no raw transport to validate",
            self.type_tag()
        )))
    }
}

/// Best-effort text for a server error body
#[must_use]
pub fn describe_body(body: Option<&[u8]>) -> String {
    match body {
        None | Some([]) => "<empty response body>".to_string(),
        Some(bytes) => std::str::from_utf8(bytes).map_or_else(
            |_| format!("<{} bytes of undecodable response body>", bytes.len()),
            str::to_string,
        ),
    }
}

/// Substitute `{{text}}`, `{{rate}}`, `{{pitch}}` and `{{volume}}` in one
/// pass. Inserted text is never rescanned; unknown placeholders stay as is.
pub(crate) fn fill_template(template: &str, text: &str, params: &ResolvedParams) -> String {
    let mut filled = String::with_capacity(template.len() + text.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        filled.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let placeholder = after.find("}}").and_then(|end| {
            let value = match &after[..end] {
                "text" => text.to_string(),
                "rate" => params.rate.to_string(),
                "pitch" => params.pitch.to_string(),
                "volume" => params.volume.to_string(),
                _ => return None,
            };
            Some((value, end + 2))
        });
        match placeholder {
            Some((value, consumed)) => {
                filled.push_str(&value);
                rest = &after[consumed..];
            }
            None => {
                filled.push_str("{{");
                rest = after;
            }
        }
    }
    filled.push_str(rest);
    filled
}
