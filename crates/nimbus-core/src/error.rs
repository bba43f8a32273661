//! Error types for nimbus-core

use thiserror::Error;

/// Result type alias for nimbus-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types
#[derive(Error, Debug)]
pub enum Error {
    /// The poll policy cannot be executed as written
    #[error("Invalid poll policy: {0}")]
    InvalidPolicy(String),

    /// The wait was abandoned through its cancellation token
    #[error("Wait cancelled")]
    Cancelled,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Internal(String),
}

impl Error {
    /// Create an invalid policy error
    pub fn invalid_policy(msg: impl Into<String>) -> Self {
        Self::InvalidPolicy(msg.into())
    }

    /// Create a generic error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::invalid_policy("interval is zero");
        assert!(err.to_string().contains("Invalid poll policy"));

        let err = Error::internal("boom");
        assert_eq!(err.to_string(), "boom");
    }
}
