//! Error types for the Voxbridge speech core.

use serde::{Deserialize, Serialize};

/// Result type alias for Voxbridge operations
pub type VoxResult<T> = Result<T, VoxError>;

/// Main error type for Voxbridge synthesis operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VoxError {
    /// The engine variant does not implement the requested synthesis mode
    #[error("Unsupported operation: {message}")]
    UnsupportedOperation {
        /// Error message naming the unsupported mode
        message: String,
    },

    /// The backend answered with a non-success status
    #[error("Server returned status {status}: {message}")]
    ServerError {
        /// Status code reported by the transport
        status: u16,
        /// Decoded response body, or a description of its length
        message: String,
    },

    /// Success status but no audio payload
    #[error("Audio is empty: {message}")]
    EmptyAudio {
        /// Error message describing the empty response
        message: String,
    },

    /// Payload present but no known container or codec signature
    #[error("Unrecognized audio format: {message}")]
    UnrecognizedFormat {
        /// Error message describing the probe failure
        message: String,
    },

    /// Network, timeout or decode failure during a request
    #[error("Transport error: {message}")]
    TransportError {
        /// Error message describing the transport failure
        message: String,
    },

    /// A direct-play engine reported failure
    #[error("Playback unsupported or failed: {message}")]
    PlaybackFailed {
        /// Error message describing the playback attempt
        message: String,
    },

    /// Invalid input error
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Error message describing the invalid input
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Engine used outside its load/destroy window
    #[error("Lifecycle error: {message}")]
    LifecycleError {
        /// Error message describing the lifecycle violation
        message: String,
    },

    /// The owning task was cancelled
    #[error("Cancelled: {message}")]
    Cancelled {
        /// Error message describing what was cancelled
        message: String,
    },
}

/// Failure taxonomy surfaced by the validation workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Engine does not support the requested mode
    UnsupportedOperation,
    /// Non-success status from the backend
    ServerError,
    /// Success status without a body
    EmptyAudio,
    /// Body present but unrecognized
    UnrecognizedFormat,
    /// Request failed below the protocol level
    TransportError,
    /// Direct-play engine reported failure
    PlaybackFailed,
    /// Anything else (bad input, configuration, lifecycle, cancellation)
    Other,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::UnsupportedOperation => "UnsupportedOperation",
            Self::ServerError => "ServerError",
            Self::EmptyAudio => "EmptyAudio",
            Self::UnrecognizedFormat => "UnrecognizedFormat",
            Self::TransportError => "TransportError",
            Self::PlaybackFailed => "PlaybackFailed",
            Self::Other => "Other",
        };
        f.write_str(name)
    }
}

impl VoxError {
    /// Create a new unsupported operation error
    #[must_use]
    pub fn unsupported<S: Into<String>>(message: S) -> Self {
        Self::UnsupportedOperation {
            message: message.into(),
        }
    }

    /// Create a new server error
    #[must_use]
    pub fn server<S: Into<String>>(status: u16, message: S) -> Self {
        Self::ServerError {
            status,
            message: message.into(),
        }
    }

    /// Create a new empty audio error
    #[must_use]
    pub fn empty_audio<S: Into<String>>(message: S) -> Self {
        Self::EmptyAudio {
            message: message.into(),
        }
    }

    /// Create a new unrecognized format error
    #[must_use]
    pub fn unrecognized_format<S: Into<String>>(message: S) -> Self {
        Self::UnrecognizedFormat {
            message: message.into(),
        }
    }

    /// Create a new transport error
    #[must_use]
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::TransportError {
            message: message.into(),
        }
    }

    /// Create a new playback failure
    #[must_use]
    pub fn playback<S: Into<String>>(message: S) -> Self {
        Self::PlaybackFailed {
            message: message.into(),
        }
    }

    /// Create a new invalid input error
    #[must_use]
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    #[must_use]
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Create a new lifecycle error
    #[must_use]
    pub fn lifecycle<S: Into<String>>(message: S) -> Self {
        Self::LifecycleError {
            message: message.into(),
        }
    }

    /// Create a new cancellation error
    #[must_use]
    pub fn cancelled<S: Into<String>>(message: S) -> Self {
        Self::Cancelled {
            message: message.into(),
        }
    }

    /// Check if a caller-side retry could plausibly succeed.
    ///
    /// The core itself never retries.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::TransportError { .. })
    }

    /// Check if this error is due to invalid user input
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. }
                | Self::ConfigurationError { .. }
                | Self::UnsupportedOperation { .. }
        )
    }

    /// Get the error category for logging
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::UnsupportedOperation { .. } => "unsupported",
            Self::ServerError { .. } => "server",
            Self::EmptyAudio { .. } => "empty_audio",
            Self::UnrecognizedFormat { .. } => "format",
            Self::TransportError { .. } => "transport",
            Self::PlaybackFailed { .. } => "playback",
            Self::InvalidInput { .. } => "input",
            Self::ConfigurationError { .. } => "configuration",
            Self::LifecycleError { .. } => "lifecycle",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// Map this error onto the validation failure taxonomy
    #[must_use]
    pub const fn failure_kind(&self) -> FailureKind {
        match self {
            Self::UnsupportedOperation { .. } => FailureKind::UnsupportedOperation,
            Self::ServerError { .. } => FailureKind::ServerError,
            Self::EmptyAudio { .. } => FailureKind::EmptyAudio,
            Self::UnrecognizedFormat { .. } => FailureKind::UnrecognizedFormat,
            Self::TransportError { .. } => FailureKind::TransportError,
            Self::PlaybackFailed { .. } => FailureKind::PlaybackFailed,
            Self::InvalidInput { .. }
            | Self::ConfigurationError { .. }
            | Self::LifecycleError { .. }
            | Self::Cancelled { .. } => FailureKind::Other,
        }
    }
}

// Convert from common error types
impl From<std::io::Error> for VoxError {
    fn from(err: std::io::Error) -> Self {
        Self::transport(err.to_string())
    }
}

impl From<reqwest::Error> for VoxError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::transport(format!("Request timed out: {err}"))
        } else if err.is_connect() {
            Self::transport(format!("Connection failed: {err}"))
        } else {
            Self::transport(err.to_string())
        }
    }
}

impl From<tokio::time::error::Elapsed> for VoxError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        Self::transport(format!("Operation timed out: {err}"))
    }
}

impl From<toml::de::Error> for VoxError {
    fn from(err: toml::de::Error) -> Self {
        Self::configuration(format!("TOML parse error: {err}"))
    }
}

impl From<serde_json::Error> for VoxError {
    fn from(err: serde_json::Error) -> Self {
        Self::configuration(format!("JSON error: {err}"))
    }
}

impl From<anyhow::Error> for VoxError {
    fn from(err: anyhow::Error) -> Self {
        Self::transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = VoxError::unsupported("buffer synthesis");
        assert_eq!(err.category(), "unsupported");
        assert!(!err.is_retriable());
        assert!(err.is_user_error());
    }

    #[test]
    fn test_error_display() {
        let err = VoxError::server(500, "Internal error");
        assert_eq!(err.to_string(), "Server returned status 500: Internal error");
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(VoxError::server(502, "test").category(), "server");
        assert_eq!(VoxError::empty_audio("test").category(), "empty_audio");
        assert_eq!(VoxError::unrecognized_format("test").category(), "format");
        assert_eq!(VoxError::transport("test").category(), "transport");
        assert_eq!(VoxError::playback("test").category(), "playback");
        assert_eq!(VoxError::invalid_input("test").category(), "input");
        assert_eq!(VoxError::configuration("test").category(), "configuration");
        assert_eq!(VoxError::lifecycle("test").category(), "lifecycle");
        assert_eq!(VoxError::cancelled("test").category(), "cancelled");
    }

    #[test]
    fn test_failure_kinds() {
        assert_eq!(VoxError::server(500, "x").failure_kind(), FailureKind::ServerError);
        assert_eq!(VoxError::empty_audio("x").failure_kind(), FailureKind::EmptyAudio);
        assert_eq!(
            VoxError::unrecognized_format("x").failure_kind(),
            FailureKind::UnrecognizedFormat
        );
        assert_eq!(VoxError::transport("x").failure_kind(), FailureKind::TransportError);
        assert_eq!(VoxError::playback("x").failure_kind(), FailureKind::PlaybackFailed);
        assert_eq!(VoxError::lifecycle("x").failure_kind(), FailureKind::Other);
    }

    #[test]
    fn test_retriable_errors() {
        assert!(VoxError::transport("test").is_retriable());
        assert!(!VoxError::server(500, "test").is_retriable());
        assert!(!VoxError::empty_audio("test").is_retriable());
        assert!(!VoxError::invalid_input("test").is_retriable());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let vox_err = VoxError::from(io_err);
        assert!(matches!(vox_err, VoxError::TransportError { .. }));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= broken").unwrap_err();
        let vox_err = VoxError::from(toml_err);
        assert!(matches!(vox_err, VoxError::ConfigurationError { .. }));
    }

    #[test]
    fn test_error_equality() {
        let err1 = VoxError::transport("test message");
        let err2 = VoxError::transport("test message");
        let err3 = VoxError::transport("different message");

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::EmptyAudio.to_string(), "EmptyAudio");
        assert_eq!(FailureKind::TransportError.to_string(), "TransportError");
    }
}
