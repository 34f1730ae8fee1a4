//! Domain error types

use thiserror::Error;

use crate::page::MAX_PAGE_SIZE;

/// Domain-level errors that can occur while building requests or uploads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The requested page size is outside `1..=100`.
    #[error("invalid page size {limit}: must be between 1 and {MAX_PAGE_SIZE}")]
    InvalidPageSize {
        /// The rejected limit.
        limit: u32,
    },

    /// A result time window ends before it starts.
    #[error("invalid time window: {0}")]
    InvalidWindow(String),

    /// An identifier is invalid or empty.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// An upload candidate has no file name.
    #[error("invalid upload: {0}")]
    InvalidUpload(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
