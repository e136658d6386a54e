//! Location identifiers.
//!
//! | Form                                  | Backend |
//! |---------------------------------------|---------|
//! | `/abs/dir`, `rel/dir`, `file:///dir`  | local directory |
//! | `s3://bucket/key/prefix`              | S3-compatible bucket |
//! | `gitfs://[repo:][ref@]path/in/tree`   | tree of a git reference |
//!
//! In the `gitfs` form the first `:` ends an embedded repository path and the
//! first `@` after it ends an embedded reference, so neither character may
//! appear in the tree path itself.

use crate::error::{ErrorKind, Result};
use std::fmt;
use std::path::PathBuf;

pub const GIT_SCHEME: &str = "gitfs://";
pub const S3_SCHEME: &str = "s3://";
pub const FILE_SCHEME: &str = "file://";

/// A parsed location identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// A directory on local disk, possibly relative to the working directory.
    Local(PathBuf),
    S3 {
        bucket: String,
        /// Key prefix without leading or trailing `/`; empty for the whole
        /// bucket.
        prefix: String,
    },
    Git {
        repo: Option<PathBuf>,
        reference: Option<String>,
        /// Subtree without leading or trailing `/`; empty for the root.
        path: String,
    },
}

impl Location {
    /// Parse a location identifier.
    ///
    /// # Errors
    ///
    /// - [`BackendUnavailable`](ErrorKind::BackendUnavailable) for an
    ///   unrecognized scheme.
    /// - [`InvalidConfiguration`](ErrorKind::InvalidConfiguration) for an
    ///   empty location or an S3 location without a bucket.
    ///
    /// # Examples
    ///
    /// ```
    /// use filecat_catalog::Location;
    /// use std::path::PathBuf;
    ///
    /// let location = Location::parse("gitfs:///srv/repo:v1.0@samples/csv").unwrap();
    /// assert_eq!(location, Location::Git {
    ///     repo: Some(PathBuf::from("/srv/repo")),
    ///     reference: Some("v1.0".to_string()),
    ///     path: "samples/csv".to_string(),
    /// });
    /// ```
    pub fn parse(location: &str) -> Result<Self> {
        if location.is_empty() {
            exn::bail!(ErrorKind::InvalidConfiguration("location is empty".to_string()));
        }
        if let Some(rest) = location.strip_prefix(GIT_SCHEME) {
            return Ok(Self::parse_git(rest));
        }
        if let Some(rest) = location.strip_prefix(S3_SCHEME) {
            let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
            if bucket.is_empty() {
                exn::bail!(ErrorKind::InvalidConfiguration(format!("no bucket in {location:?}")));
            }
            return Ok(Self::S3 {
                bucket: bucket.to_string(),
                prefix: prefix.trim_matches('/').to_string(),
            });
        }
        if let Some(rest) = location.strip_prefix(FILE_SCHEME) {
            return Ok(Self::Local(PathBuf::from(rest)));
        }
        if let Some((scheme, _)) = location.split_once("://") {
            exn::bail!(ErrorKind::BackendUnavailable(format!("unsupported location scheme {scheme:?}")));
        }
        Ok(Self::Local(PathBuf::from(location)))
    }

    fn parse_git(rest: &str) -> Self {
        let (repo, rest) = match rest.split_once(':') {
            Some((repo, rest)) => (Some(repo), rest),
            None => (None, rest),
        };
        let (reference, path) = match rest.split_once('@') {
            Some((reference, path)) => (Some(reference), path),
            None => (None, rest),
        };
        Self::Git {
            repo: repo.filter(|repo| !repo.is_empty()).map(PathBuf::from),
            reference: reference.filter(|reference| !reference.is_empty()).map(str::to_string),
            path: path.trim_matches('/').to_string(),
        }
    }

    /// Short name of the backend kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::S3 { .. } => "s3",
            Self::Git { .. } => "git",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::S3 { bucket, prefix } => write!(f, "{S3_SCHEME}{bucket}/{prefix}"),
            Self::Git { repo, reference, path } => {
                f.write_str(GIT_SCHEME)?;
                if let Some(repo) = repo {
                    write!(f, "{}:", repo.display())?;
                }
                if let Some(reference) = reference {
                    write!(f, "{reference}@")?;
                }
                f.write_str(path)
            },
        }
    }
}

/// Build the primary key of a file: the location with trailing separators
/// removed, joined with `/` to the root-relative path.
///
/// ```
/// assert_eq!(filecat_catalog::file_url("s3://bucket/data/", "csv/a.csv"), "s3://bucket/data/csv/a.csv");
/// ```
pub fn file_url(location: &str, path: &str) -> String {
    format!("{}/{}", location.trim_end_matches('/'), path)
}
