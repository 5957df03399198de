//! Error types for dictionary operations.

use thiserror::Error;

/// Errors returned by [`SimilarKeyDict`](crate::SimilarKeyDict) operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The key is not present in the dictionary.
    ///
    /// Returned by the strict lookup and removal methods (`try_get`,
    /// `delete`, `pop`) instead of silently doing nothing.
    #[error("key not found")]
    KeyNotFound,

    /// The dictionary has no entries.
    ///
    /// Returned by `pop_item` on an empty dictionary.
    #[error("dictionary is empty")]
    Empty,

    /// A pattern passed to a regex query failed to compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
}

/// A specialized `Result` type for dictionary operations.
pub type Result<T> = std::result::Result<T, Error>;
