//! Git Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction, same as every other crate in the workspace.

use derive_more::{Display, Error};

/// A git error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for git operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Path is not usable in a path-spec (leading separator, or an empty
    /// path where a file must be named). Fix the input; don't retry.
    #[display("invalid path for path-spec: {_0:?}")]
    InvalidPath(#[error(not(source))] String),
    /// The `git` executable could not be located on `PATH`.
    #[display("git executable not found")]
    GitNotFound,
    /// Git ran but reported failure (unknown reference, not a repository,
    /// untracked path...). Carries git's own stderr.
    #[display("git query failed: {_0}")]
    RevisionQuery(#[error(not(source))] String),
    /// Git produced log output that cannot be interpreted. Never recovered
    /// from, as a wrong guess would attribute the wrong timestamp to a file.
    #[display("malformed history: {_0}")]
    MalformedHistory(#[error(not(source))] String),
    /// Git produced tree listing output that cannot be interpreted.
    #[display("malformed tree listing: {_0}")]
    MalformedTree(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RevisionQuery(_))
    }
}
