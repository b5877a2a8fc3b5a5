//! Error types for capture, editing and storage

use thiserror::Error;

/// Result type alias for fullshot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while capturing, editing or storing screenshots
#[derive(Error, Debug)]
pub enum Error {
    /// The target page uses a privileged scheme and is never captured
    #[error("Cannot capture this page: {0}")]
    PageNotAccessible(String),

    /// A capture is already running on the same capturer
    #[error("Capture already in progress")]
    CaptureInProgress,

    /// A message to or from the page context could not be delivered
    #[error("Transport failure: {0}")]
    TransportError(String),

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// A captured raster could not be decoded
    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    /// The composite canvas could not be encoded
    #[error("Failed to encode image: {0}")]
    EncodeError(String),

    /// The requested output format is not supported
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Reading or writing the key-value store failed
    #[error("Storage error: {0}")]
    StorageError(String),

    /// A stored screenshot or key was not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Failed to initialize a page surface
    #[error("Initialization failed: {0}")]
    InitializationError(String),

    /// CDP-specific error
    #[cfg(feature = "cdp")]
    #[error("CDP error: {0}")]
    CdpError(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Catalog key of the localized message shown to users for this error,
    /// if one exists. See [`crate::i18n::Catalog`].
    pub fn message_key(&self) -> Option<&'static str> {
        match self {
            Error::PageNotAccessible(_) => Some("invalidPage"),
            Error::CaptureInProgress => Some("captureInProgress"),
            Error::Timeout(_) => Some("captureTimeout"),
            Error::UnsupportedFormat(_) => Some("formatUnsupported"),
            Error::NotFound(_) => Some("screenshotNotFound"),
            Error::TransportError(_) | Error::DecodeError(_) | Error::EncodeError(_) => {
                Some("captureError")
            }
            #[cfg(feature = "cdp")]
            Error::CdpError(_) => Some("captureError"),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::StorageError(err.to_string())
    }
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::CdpError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_facing_errors_have_message_keys() {
        assert_eq!(
            Error::PageNotAccessible("chrome://settings".into()).message_key(),
            Some("invalidPage")
        );
        assert_eq!(Error::Timeout(60000).message_key(), Some("captureTimeout"));
        assert_eq!(Error::Other("x".into()).message_key(), None);
    }

    #[test]
    fn display_includes_context() {
        let e = Error::Timeout(60000);
        assert_eq!(e.to_string(), "Operation timed out after 60000ms");
        assert_eq!(Error::CaptureInProgress.to_string(), "Capture already in progress");
    }
}
