//! Audio codec table shared by the probe and the format descriptors.

use crate::error::{VoxError, VoxResult};
use serde::{Deserialize, Serialize};

/// Audio containers and codecs engines may return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    /// WAV/RIFF container
    Wav,
    /// MPEG Audio Layer III
    Mp3,
    /// ADTS-framed AAC
    Aac,
    /// Free Lossless Audio Codec
    Flac,
    /// Ogg Vorbis
    Ogg,
    /// Ogg Opus
    Opus,
    /// WebM (Matroska) audio, usually Opus
    Webm,
    /// MPEG-4 audio, usually AAC
    M4a,
    /// Headerless 16-bit PCM
    Pcm,
}

impl AudioCodec {
    /// Get file extension for the codec
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Aac => "aac",
            Self::Flac => "flac",
            Self::Ogg => "ogg",
            Self::Opus => "opus",
            Self::Webm => "webm",
            Self::M4a => "m4a",
            Self::Pcm => "pcm",
        }
    }

    /// Get MIME type for the codec
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
            Self::Aac => "audio/aac",
            Self::Flac => "audio/flac",
            Self::Ogg => "audio/ogg",
            Self::Opus => "audio/opus",
            Self::Webm => "audio/webm",
            Self::M4a => "audio/mp4",
            Self::Pcm => "audio/raw",
        }
    }

    /// Check if the codec is lossy
    #[must_use]
    pub const fn is_lossy(self) -> bool {
        matches!(
            self,
            Self::Mp3 | Self::Aac | Self::Ogg | Self::Opus | Self::Webm | Self::M4a
        )
    }

    /// Whether output in this codec must be decoded before PCM playback
    #[must_use]
    pub const fn needs_decode(self) -> bool {
        !matches!(self, Self::Pcm)
    }

    /// Parse a MIME type, ignoring parameters such as `; codecs=...`
    ///
    /// # Errors
    ///
    /// Returns an error if the MIME type is not an audio type we know
    pub fn from_mime(mime: &str) -> VoxResult<Self> {
        let main_type = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        match main_type.as_str() {
            "audio/wav" | "audio/wave" | "audio/x-wav" => Ok(Self::Wav),
            "audio/mpeg" | "audio/mp3" => Ok(Self::Mp3),
            "audio/aac" | "audio/aacp" | "audio/mp4a-latm" => Ok(Self::Aac),
            "audio/flac" | "audio/x-flac" => Ok(Self::Flac),
            "audio/ogg" | "audio/vorbis" => Ok(Self::Ogg),
            "audio/opus" => Ok(Self::Opus),
            "audio/webm" => Ok(Self::Webm),
            "audio/mp4" | "audio/m4a" | "audio/x-m4a" => Ok(Self::M4a),
            "audio/raw" | "audio/pcm" | "audio/l16" => Ok(Self::Pcm),
            _ => Err(VoxError::invalid_input(format!(
                "Unsupported audio MIME type: {mime}"
            ))),
        }
    }

    /// Detect codec from file extension
    ///
    /// # Errors
    ///
    /// Returns an error if the extension is not supported
    pub fn from_extension(extension: &str) -> VoxResult<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|codec| codec.extension().eq_ignore_ascii_case(extension))
            .ok_or_else(|| {
                VoxError::invalid_input(format!("Unsupported audio format: {extension}"))
            })
    }

    /// Get all supported codecs
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Wav,
            Self::Mp3,
            Self::Aac,
            Self::Flac,
            Self::Ogg,
            Self::Opus,
            Self::Webm,
            Self::M4a,
            Self::Pcm,
        ]
    }
}

impl std::fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension().to_uppercase())
    }
}
