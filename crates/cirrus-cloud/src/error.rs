//! Error types for the cloud provider.

use thiserror::Error;

/// A specialized Result type for cloud operations.
pub type Result<T> = std::result::Result<T, CloudError>;

/// Errors surfaced by cloud API operations.
#[derive(Debug, Error)]
pub enum CloudError {
    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote API rejected the call.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the API.
        status: u16,
        /// Message extracted from the error body.
        message: String,
    },

    /// Authentication or service-catalog failure.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Invalid provider configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl CloudError {
    /// True when the remote reported the resource as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}
