use std::io;
use std::time::Duration;

use thiserror::Error;

/// Errors produced while dispatching a chat request
///
/// Payloads are plain strings so the error can be cloned, which lets the
/// executor hand a redacted copy to hooks while the caller keeps the original.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    /// Model identifier is not of the form `provider/model`
    #[error("invalid model identifier '{model}': expected 'provider/model'")]
    InvalidModelId { model: String },

    /// No provider registered under the requested id
    #[error("unknown provider: {provider}")]
    UnknownProvider { provider: String },

    /// Client or provider was configured incorrectly
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Attempt exceeded its configured deadline
    #[error("request timed out after {}ms", .timeout.as_millis())]
    Timeout { timeout: Duration },

    /// Caller cancelled the request
    #[error("request cancelled")]
    Cancelled,

    /// Connection-level failure talking to the backend
    #[error("transport error: {0}")]
    Transport(String),

    /// Generic I/O failure
    #[error("i/o error: {message}")]
    Io { kind: io::ErrorKind, message: String },

    /// Backend answered with an error
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Request was rejected before reaching the backend
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Credentials are missing, expired or rejected
    #[error("authentication error: {0}")]
    Auth(String),

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl LlmError {
    /// Whether this error is a transient condition worth retrying
    ///
    /// Used as the default retry predicate: timeouts, transport failures
    /// and generic I/O errors.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport(_) | Self::Io { .. })
    }

    /// Stable machine-readable classification
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidModelId { .. } => "invalid_model_id",
            Self::UnknownProvider { .. } => "unknown_provider",
            Self::Configuration(_) => "configuration",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled => "cancelled",
            Self::Transport(_) => "transport",
            Self::Io { .. } => "io",
            Self::Upstream(_) => "upstream",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Auth(_) => "auth",
            Self::Internal(_) => "internal",
        }
    }

    /// Rebuild this error with a new message, keeping its kind
    ///
    /// Variants whose message is derived from structured fields carry the
    /// rewritten text in the field that produced it.
    #[must_use]
    pub fn with_message(&self, message: String) -> Self {
        match self {
            Self::InvalidModelId { .. } => Self::InvalidModelId { model: message },
            Self::UnknownProvider { .. } => Self::UnknownProvider { provider: message },
            Self::Configuration(_) => Self::Configuration(message),
            Self::Timeout { timeout } => Self::Timeout { timeout: *timeout },
            Self::Cancelled => Self::Cancelled,
            Self::Transport(_) => Self::Transport(message),
            Self::Io { kind, .. } => Self::Io { kind: *kind, message },
            Self::Upstream(_) => Self::Upstream(message),
            Self::InvalidRequest(_) => Self::InvalidRequest(message),
            Self::Auth(_) => Self::Auth(message),
            Self::Internal(_) => Self::Internal(message),
        }
    }

    /// The free-form part of the message, if the variant has one
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::InvalidModelId { model: text }
            | Self::UnknownProvider { provider: text }
            | Self::Configuration(text)
            | Self::Transport(text)
            | Self::Io { message: text, .. }
            | Self::Upstream(text)
            | Self::InvalidRequest(text)
            | Self::Auth(text)
            | Self::Internal(text) => Some(text),
            Self::Timeout { .. } | Self::Cancelled => None,
        }
    }
}

impl From<io::Error> for LlmError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
