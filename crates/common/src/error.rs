//! Error types shared across movcap crates.

/// Top-level error type for movcap operations.
#[derive(Debug, thiserror::Error)]
pub enum MovcapError {
    #[error("No displays available")]
    NoDisplay,

    #[error("Display {index} not found. Available displays: {available}")]
    InvalidDisplay { index: usize, available: usize },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Failed to start capture session: {message}")]
    SessionStartFailed { message: String },

    #[error("Failed to write capture: {message}")]
    WriteFailed { message: String },

    #[error("A capture session is already active")]
    SessionActive,

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Platform error: {message}")]
    Platform { message: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using MovcapError.
pub type MovcapResult<T> = Result<T, MovcapError>;

impl MovcapError {
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: msg.into(),
        }
    }

    pub fn session_start(msg: impl Into<String>) -> Self {
        Self::SessionStartFailed {
            message: msg.into(),
        }
    }

    pub fn write_failed(msg: impl Into<String>) -> Self {
        Self::WriteFailed {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }
}
