use thiserror::Error;

/// Workspace-wide error types for the epoch ticker.
#[derive(Debug, Error)]
pub enum TickerError {
    /// Every configured RPC endpoint failed within the retry budget.
    #[error("Chain unavailable after {attempts} attempts: {last_error}")]
    ChainUnavailable { attempts: u32, last_error: String },

    /// A single RPC call failed (transport, HTTP status, or JSON-RPC error).
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Storage layer error (checkpoint or history operation failed).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Missing or invalid configuration detected before the loop starts.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid state transition.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl TickerError {
    /// Whether the scheduler loop should recover from this error in place
    /// (retry after a backoff) rather than propagate it.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TickerError::ChainUnavailable { .. } | TickerError::Rpc(_))
    }
}

impl From<serde_json::Error> for TickerError {
    fn from(e: serde_json::Error) -> Self {
        TickerError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_failures_are_retryable() {
        let err = TickerError::ChainUnavailable {
            attempts: 3,
            last_error: "connection refused".to_string(),
        };
        assert!(err.is_retryable());
        assert!(TickerError::Rpc("timeout".to_string()).is_retryable());
    }

    #[test]
    fn storage_failures_are_not_retryable() {
        assert!(!TickerError::Storage("disk full".to_string()).is_retryable());
        assert!(!TickerError::Configuration("no nodes".to_string()).is_retryable());
    }

    #[test]
    fn serde_errors_map_to_serialization() {
        let err: TickerError = serde_json::from_str::<u64>("not a number")
            .unwrap_err()
            .into();
        assert!(matches!(err, TickerError::Serialization(_)));
    }

    #[test]
    fn chain_unavailable_display_includes_attempts() {
        let err = TickerError::ChainUnavailable {
            attempts: 5,
            last_error: "boom".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Chain unavailable after 5 attempts: boom"
        );
    }
}
