//! Application error types

use shelfscan_domain::{ApiErrorDetail, DomainError};
use thiserror::Error;

/// Application-level errors.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// A domain validation error occurred.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// The remote API call did not succeed.
    #[error("API error: {0}")]
    Api(#[from] ApiErrorDetail),

    /// A background task failed.
    #[error("internal error: {0}")]
    Internal(String),

    /// The operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,
}

/// Result type alias for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
