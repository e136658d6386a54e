//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use filecat_git::error::ErrorKind as GitErrorKind;
use std::io::Error as IoError;
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// File does not exist
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Access denied (permissions or credentials)
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Network-related error (S3 connections, etc.)
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// Path contains invalid characters or escapes root
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
    /// The backend can't be constructed or reached at all (missing root,
    /// not a repository, unknown reference, rejected credentials).
    #[display("backend unavailable: {_0}")]
    Unavailable(#[error(not(source))] String),
    /// The version-control history query failed.
    #[display("revision query failed")]
    RevisionQuery,
    /// The version-control tool produced history that can't be interpreted.
    #[display("malformed history")]
    MalformedHistory,
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}
impl ErrorKind {
    /// Convert a git error into a storage error, keeping the git crate's
    /// frame as a child in the error tree.
    #[track_caller]
    pub fn git(err: filecat_git::error::Error) -> Error {
        let kind = match &*err {
            GitErrorKind::MalformedHistory(_) | GitErrorKind::MalformedTree(_) => ErrorKind::MalformedHistory,
            GitErrorKind::InvalidPath(path) => ErrorKind::InvalidPath(PathBuf::from(path)),
            GitErrorKind::GitNotFound | GitErrorKind::RevisionQuery(_) => ErrorKind::RevisionQuery,
        };
        err.raise(kind)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Network(_) | Self::BackendError(_) | Self::Unavailable(_) | Self::RevisionQuery
        )
    }
}
