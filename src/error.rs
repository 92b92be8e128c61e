//! Error types for arena-link.

use thiserror::Error;

/// Errors that can occur in the live-update client.
#[derive(Error, Debug)]
pub enum ArenaLinkError {
    /// Invalid base URL or option values supplied at construction time.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The push transport failed to open, or errored after being open.
    /// Both cases route into the reconnect/backoff policy.
    #[error("Push transport error: {0}")]
    PushTransportError(String),

    /// A poll request failed: network error, non-2xx response, or the server
    /// reported `success = false`. Retried via the backoff policy, never fatal.
    #[error("Fetch error: {0}")]
    FetchError(String),

    /// An operation exceeded its configured deadline.
    #[error("Timeout: {0}")]
    TimeoutError(String),

    /// Malformed inbound message. Logged and dropped by the manager; never
    /// changes connection state and never counts toward reconnect attempts.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Underlying HTTP client error.
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON (de)serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Invariant violation inside the client (poisoned lock, lost channel).
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Result type for arena-link operations.
pub type Result<T> = std::result::Result<T, ArenaLinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_context() {
        let err = ArenaLinkError::FetchError("HTTP 503".to_string());
        assert_eq!(err.to_string(), "Fetch error: HTTP 503");

        let err = ArenaLinkError::PushTransportError("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_serde_error_converts() {
        let parse_failure = serde_json::from_str::<serde_json::Value>("{not json");
        let err: ArenaLinkError = parse_failure.unwrap_err().into();
        assert!(matches!(err, ArenaLinkError::SerializationError(_)));
    }
}
