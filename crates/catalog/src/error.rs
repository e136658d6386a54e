//! Catalog Error Types
//!
//! Callers match on [`ErrorKind`] to decide what to do with a failed run:
//! fix their input, retry the whole run, or give up.

use derive_more::{Display, Error};
use filecat_storage::error::{Error as StorageError, ErrorKind as StorageErrorKind};
use std::path::PathBuf;

/// A catalog error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// ### Caller Input Errors
/// Raised before any I/O happens; retrying with the same input is pointless.
/// - [`ErrorKind::InvalidPath`]
/// - [`ErrorKind::InvalidPattern`]
/// - [`ErrorKind::InvalidConfiguration`]
///
/// ### Environment Errors
/// Retryable at the granularity of a whole run.
/// - [`ErrorKind::BackendUnavailable`]
/// - [`ErrorKind::RevisionQuery`]
///
/// ### Fatal Errors
/// - [`ErrorKind::MalformedHistory`]
/// - [`ErrorKind::ContentRead`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    #[display("invalid glob pattern: {_0}")]
    InvalidPattern(#[error(not(source))] String),
    #[display("invalid configuration: {_0}")]
    InvalidConfiguration(#[error(not(source))] String),
    /// Unknown location scheme, unreachable backend or rejected credentials.
    #[display("backend unavailable: {_0}")]
    BackendUnavailable(#[error(not(source))] String),
    #[display("revision query failed")]
    RevisionQuery,
    /// The version-control tool produced output that can't be interpreted.
    /// Never recovered from: a guess could attach the wrong timestamp.
    #[display("malformed history")]
    MalformedHistory,
    /// Loading a file's content failed. Aborts the run, since a page with
    /// a missing file would corrupt downstream record counts.
    #[display("failed to read content of {}", _0.display())]
    ContentRead(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying the whole run might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BackendUnavailable(_) | Self::RevisionQuery)
    }

    /// Re-classify a storage error, keeping it as a child in the error tree.
    #[track_caller]
    pub(crate) fn storage(err: StorageError) -> Error {
        let kind = match &*err {
            StorageErrorKind::InvalidPath(path) => Self::InvalidPath(path.clone()),
            StorageErrorKind::RevisionQuery => Self::RevisionQuery,
            StorageErrorKind::MalformedHistory => Self::MalformedHistory,
            other => Self::BackendUnavailable(other.to_string()),
        };
        err.raise(kind)
    }
}
