//! Path validation for backend-relative paths.
//!
//! Every backend addresses files by a path relative to its own root. These
//! helpers normalize such paths and refuse anything that would escape the
//! root.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Normalize a backend-relative path.
///
/// `.` components, repeated and trailing separators are removed, a leading
/// separator is ignored and `..` is resolved as long as it never climbs above
/// the root. NUL bytes and paths that normalize to nothing are rejected with
/// [`InvalidPath`](crate::error::ErrorKind::InvalidPath).
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use filecat_storage::validate_path;
/// assert!(validate_path("csv/freshman_kgs.csv").is_ok());
/// assert!(validate_path("a/../sample.txt").is_ok());
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("a\0b").is_err());
/// assert_eq!(
///     validate_path("csv/.././met_csv//A801/").unwrap(),
///     Path::new("met_csv/A801")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    match normalize(path.as_ref())? {
        Some(normalized) => Ok(normalized),
        None => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
    }
}

/// Like [`validate()`], for listing prefixes: a prefix that normalizes to
/// nothing (`""`, `"."`, `"/"`) means "everything" and becomes `None`.
pub fn validate_prefix(prefix: Option<&Path>) -> Result<Option<PathBuf>> {
    match prefix {
        Some(prefix) => normalize(prefix),
        None => Ok(None),
    }
}

fn normalize(path: &Path) -> Result<Option<PathBuf>> {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(s) => {
                // Path::components() lets NUL through on Unix.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(path.to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
                }
            },
        }
    }
    Ok((!components.is_empty()).then(|| components.into_iter().collect()))
}

/// Render a backend-relative path with `/` separators regardless of
/// platform, as used in object keys, git trees and file URLs.
///
/// Fails with [`InvalidPath`](crate::error::ErrorKind::InvalidPath) on
/// non-UTF-8 components.
pub fn to_slash(path: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        if let Component::Normal(s) = component {
            let Some(s) = s.to_str() else {
                exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
            };
            parts.push(s);
        }
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        assert_eq!(validate(Path::new("csv/mlb_players.csv")).unwrap(), Path::new("csv/mlb_players.csv"));
        assert_eq!(validate(Path::new("sample.txt")).unwrap(), Path::new("sample.txt"));
        // Leading separator is dropped, not rejected
        assert_eq!(validate(Path::new("/sample.txt")).unwrap(), Path::new("sample.txt"));
    }

    #[test]
    fn test_normalization() {
        assert_eq!(validate(Path::new("a//b//c")).unwrap(), Path::new("a/b/c"));
        assert_eq!(validate(Path::new("a/./b/./c")).unwrap(), Path::new("a/b/c"));
        assert_eq!(validate(Path::new("a/b/..")).unwrap(), Path::new("a"));
        assert_eq!(validate(Path::new("met_csv///")).unwrap(), Path::new("met_csv"));
    }

    #[test]
    fn test_traversal_attempts() {
        assert!(validate(Path::new("../etc/passwd")).is_err());
        assert!(validate(Path::new("a/../../b")).is_err());
        assert!(validate(Path::new("..")).is_err());
    }

    #[test]
    fn test_invalid_characters() {
        let err = validate(Path::new("a\0b")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }

    #[test]
    fn test_empty_paths() {
        assert!(validate(Path::new("")).is_err());
        assert!(validate(Path::new("./")).is_err());
        assert!(validate(Path::new("//")).is_err());
    }

    #[test]
    fn test_prefix() {
        assert_eq!(validate_prefix(None).unwrap(), None);
        assert_eq!(validate_prefix(Some(Path::new(""))).unwrap(), None);
        assert_eq!(validate_prefix(Some(Path::new("./"))).unwrap(), None);
        assert_eq!(validate_prefix(Some(Path::new("csv/"))).unwrap(), Some(PathBuf::from("csv")));
        assert!(validate_prefix(Some(Path::new("../csv"))).is_err());
    }

    #[test]
    fn test_to_slash() {
        assert_eq!(to_slash(Path::new("met_csv/A801/A881_20230920.csv")).unwrap(), "met_csv/A801/A881_20230920.csv");
        assert_eq!(to_slash(Path::new("")).unwrap(), "");
        assert_eq!(to_slash(&Path::new("a").join("b")).unwrap(), "a/b");
    }
}
