//! # Store Errors
//!
//! Error types for the data-store connection layer.

use std::time::Duration;

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Data-store connection errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Connection target could not be parsed
    #[error("Invalid store target: {0}")]
    InvalidTarget(String),

    /// Target host did not resolve to any address
    #[error("Store host could not be resolved: {0}")]
    Unresolvable(String),

    /// Connect attempt failed
    #[error("Store connection failed: {0}")]
    ConnectFailed(String),

    /// Connect attempt did not finish within the configured timeout
    #[error("Store connection timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Store explicitly reported as unavailable
    #[error("Store unavailable")]
    Unavailable,
}

impl StoreError {
    /// Stable error kind used in structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::InvalidTarget(_) => "invalid_target",
            StoreError::Unresolvable(_) => "unresolvable",
            StoreError::ConnectFailed(_) => "connect_failed",
            StoreError::Timeout(_) => "timeout",
            StoreError::Unavailable => "unavailable",
        }
    }

    /// Configuration problems cannot be fixed by retrying
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, StoreError::InvalidTarget(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        let err = StoreError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "Store connection timed out after 250ms");
        assert_eq!(err.kind(), "timeout");
    }

    #[test]
    fn test_configuration_errors() {
        assert!(StoreError::InvalidTarget("nope".to_string()).is_configuration_error());
        assert!(!StoreError::Unavailable.is_configuration_error());
    }
}
