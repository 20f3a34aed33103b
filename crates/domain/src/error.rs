//! Domain error types

use thiserror::Error;

/// Domain-level errors raised while interpreting a test-specification document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The document does not have the recognised shape.
    #[error("invalid test document: {0}")]
    InvalidDocument(String),

    /// An input specification cannot be turned into call arguments.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A dot path is empty or contains an empty segment.
    #[error("invalid key path: {0:?}")]
    InvalidPath(String),

    /// The HTTP method is not supported.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
