//! Error types for lazytree core.

use thiserror::Error;

/// Errors raised while constructing core values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("empty row range: first={first}, last={last}")]
    EmptyRange { first: usize, last: usize },

    #[error("row range of length zero starting at {0}")]
    ZeroLength(usize),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
