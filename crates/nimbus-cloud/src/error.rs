//! Error types for nimbus-cloud

use crate::provider::ProviderKind;
use thiserror::Error;

/// Result type alias for nimbus-cloud operations
pub type Result<T> = std::result::Result<T, Error>;

/// Cloud abstraction error types
#[derive(Error, Debug)]
pub enum Error {
    /// A provider API call was rejected
    #[error("{provider} API error: {message}")]
    Api {
        /// Provider that rejected the call
        provider: ProviderKind,
        /// Provider-reported message
        message: String,
    },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Authentication was rejected
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// No usable credentials were found for a provider
    #[error("Credentials not found for {0}")]
    CredentialsNotFound(String),

    /// A named resource does not exist
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The provider does not support the requested operation
    #[error("Operation not supported: {0}")]
    Unsupported(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// YAML parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the core wait machinery
    #[error(transparent)]
    Core(#[from] nimbus_core::Error),
}

impl Error {
    /// Create a provider API error
    pub fn api(provider: ProviderKind, message: impl Into<String>) -> Self {
        Self::Api {
            provider,
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Create a credentials-not-found error
    pub fn credentials_not_found(provider: impl Into<String>) -> Self {
        Self::CredentialsNotFound(provider.into())
    }

    /// Create a resource-not-found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// Create an unsupported-operation error
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported(operation.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::api(ProviderKind::Aws, "throttled");
        assert!(err.to_string().contains("aws API error"));

        let err = Error::credentials_not_found("gce");
        assert!(err.to_string().contains("Credentials not found"));
    }
}
