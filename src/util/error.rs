//! Unified error types for fieldlog.
//!
//! All fallible operations throughout the codebase return `Result<T, FieldLogError>`.
//! Per-line problems (malformed lines, bad timestamps) are never errors: the
//! scanner skips them. Errors are reserved for storage, configuration and
//! transport failures that the caller has to see.

/// Unified error type used throughout fieldlog.
#[derive(Debug, thiserror::Error)]
pub enum FieldLogError {
    /// The storage root could not be mounted (missing, not a directory, ...).
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A record could not be encoded into the line format.
    #[error("Codec error: {0}")]
    Codec(String),

    /// Timestamp text could not be parsed.
    #[error("Invalid timestamp: {0:?}")]
    TimestampParse(String),

    /// A publish attempt failed. `topic` is the destination topic.
    #[error("Publish to '{topic}' failed: {reason}")]
    Publish {
        /// Topic the message was addressed to.
        topic: String,
        /// Transport-specific failure description.
        reason: String,
    },

    /// A caller supplied an argument outside its contract (e.g. `page_length == 0`).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration file or request payload could not be understood.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON (de)serialisation failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for I/O errors (file reads, writes, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FieldLogError>;

/// Build a [`FieldLogError::Publish`] for the given topic.
///
/// # Example
/// ```
/// let err = fieldlog::util::error::publish_err("datagator/data", "broker gone");
/// assert!(err.to_string().contains("broker gone"));
/// ```
pub fn publish_err(topic: impl Into<String>, reason: impl Into<String>) -> FieldLogError {
    FieldLogError::Publish {
        topic: topic.into(),
        reason: reason.into(),
    }
}
