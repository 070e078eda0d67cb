//! Error taxonomy for the convergence engines.
//!
//! Two failure classes matter to callers: configuration errors abort
//! before any mutation is attempted, while remote failures propagate
//! as-is with no retry and no compensation. A failed delete-then-create
//! replace leaves the resource absent; rerunning the invocation
//! re-derives the decision from freshly observed state.

use thiserror::Error;

/// A result type using `ConvergeError`.
pub type Result<T> = std::result::Result<T, ConvergeError>;

/// Errors surfaced by the convergence engines.
#[derive(Debug, Error)]
pub enum ConvergeError {
    /// Invalid declared parameters; nothing was attempted remotely.
    #[error("configuration error: {0}")]
    Config(String),

    /// A remote operation failed; the run stops where it was.
    #[error(transparent)]
    Cloud(#[from] cirrus_cloud::CloudError),

    /// An engine invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ConvergeError {
    /// True when the failure is in the declared parameters rather than
    /// the remote cloud.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
