use std::fmt;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Transport,
    Authentication,
    Quota,
    ContentBlocked,
    InvalidResponse,
    Unsupported,
    Api,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderErrorKind::Transport => "TransportError",
            ProviderErrorKind::Authentication => "AuthenticationError",
            ProviderErrorKind::Quota => "QuotaExceeded",
            ProviderErrorKind::ContentBlocked => "ContentBlocked",
            ProviderErrorKind::InvalidResponse => "InvalidResponse",
            ProviderErrorKind::Unsupported => "Unsupported",
            ProviderErrorKind::Api => "ApiError",
        };
        f.write_str(name)
    }
}

/// Failure reported by the AI client. Shown as an `error` turn; the
/// conversation continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} - {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_decode() {
            ProviderErrorKind::InvalidResponse
        } else {
            ProviderErrorKind::Transport
        };
        ProviderError::new(kind, err.to_string())
    }
}

/// Failure while saving or loading a conversation file.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed conversation file: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("There is no conversation history to save")]
    EmptyHistory,
}

/// Rejected attachment. Shown as a `system` notice; no turn or request.
#[derive(Debug, thiserror::Error)]
pub enum UnsupportedMediaError {
    #[error("Unsupported media type {mime_type} for {path}")]
    UnsupportedType { path: PathBuf, mime_type: String },

    #[error("Unsupported media format for {path}")]
    NotText { path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
}
