//! Error types for the storage and transport layers.
//!
//! Presence reporting never surfaces these to the UI; they exist so lower layers
//! can say what went wrong before the reporter logs and drops them.

use thiserror::Error;

/// Failure reading or writing durable client-side storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// No storage backend (private browsing, disabled storage, no config dir).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage quota exceeded while writing '{key}'")]
    QuotaExceeded { key: String },
    #[error("could not encode value for '{key}': {reason}")]
    Serialization { key: String, reason: String },
    #[error("storage i/o error: {0}")]
    Io(String),
}

/// Failure delivering a presence report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("invalid presence endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("presence endpoint answered HTTP {status}")]
    Http { status: u16 },
    /// The platform refused to queue the request (e.g. beacon payload too large).
    #[error("delivery rejected: {0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_piece() {
        let err = StorageError::QuotaExceeded {
            key: "opsdash_client_id".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "storage quota exceeded while writing 'opsdash_client_id'"
        );
        assert_eq!(
            TransportError::Http { status: 503 }.to_string(),
            "presence endpoint answered HTTP 503"
        );
    }
}
