//! Error types for the reconciler
//!
//! Anomalies in the event stream (duplicates, late events, bad transitions)
//! are not errors. They are recorded as [`crate::types::Warning`]s. The
//! variants here cover malformed input at the intake boundary and failures
//! of the surrounding plumbing.

use thiserror::Error;

/// Result type for reconciler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler errors
#[derive(Error, Debug)]
pub enum Error {
    /// Required event field absent or empty
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Status outside the known enumeration
    #[error("Invalid status '{0}'. Must be one of: initiated, processing, settled, failed")]
    InvalidStatus(String),

    /// Timestamp not parseable as RFC 3339 / ISO 8601
    #[error("Invalid timestamp '{0}'. Use ISO 8601")]
    InvalidTimestamp(String),

    /// Event rejected for another structural reason
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// Storage backend error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Snapshot serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// JSON decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the error describes a rejected payload rather than a system fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::MissingField(_)
                | Error::InvalidStatus(_)
                | Error::InvalidTimestamp(_)
                | Error::InvalidEvent(_)
                | Error::Json(_)
        )
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(Error::MissingField("event_id").is_client_error());
        assert!(Error::InvalidStatus("done".into()).is_client_error());
        assert!(!Error::Storage("disk full".into()).is_client_error());
        assert!(!Error::Concurrency("closed".into()).is_client_error());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::MissingField("timestamp").to_string(),
            "Missing required field: timestamp"
        );
        assert!(Error::InvalidStatus("done".into())
            .to_string()
            .contains("initiated, processing, settled, failed"));
    }
}
