//! Path-spec construction for history queries.
//!
//! Git's `glob` pathspec magic uses `fnmatch(3)` with `FNM_PATHNAME`, so a
//! single `*` never crosses a `/`. That is *not* how shell globs behave, and
//! it is why directories get an explicit `/**` suffix below.

use crate::error::{ErrorKind, Result};
use std::ffi::OsStr;
use std::fmt;

/// Magic prefix: match from the top of the working tree, glob-style.
const TOP_GLOB: &str = ":(top,glob)";
/// Magic prefix: the whole tree from the top, no pattern.
const TOP: &str = ":(top)";
/// Magic prefix: exactly this path from the top, glob characters included.
const TOP_LITERAL: &str = ":(top,literal)";

/// What kind of object a path names inside the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    File,
    Directory,
}

/// A compiled path-matching expression, consumed by `git log`.
///
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSpec(String);

impl PathSpec {
    /// Build the path-spec for a root-relative `path`.
    ///
    /// - `path` must not start with a separator.
    /// - A [`File`](ObjectKind::File) must be named (non-empty path).
    /// - A non-empty [`Directory`](ObjectKind::Directory) matches everything
    ///   inside it, at any depth.
    /// - The empty directory is the root of the tree. `fnmatch` rejects a
    ///   leading separator, so the root gets a bare wildcard instead.
    ///
    /// # Examples
    ///
    /// ```
    /// use filecat_git::{ObjectKind, PathSpec};
    ///
    /// assert_eq!(PathSpec::build("", ObjectKind::Directory).unwrap().as_str(), ":(top,glob)*");
    /// assert_eq!(PathSpec::build("docs", ObjectKind::Directory).unwrap().as_str(), ":(top,glob)docs/**");
    /// assert_eq!(PathSpec::build("docs/a.md", ObjectKind::File).unwrap().as_str(), ":(top,glob)docs/a.md");
    /// assert!(PathSpec::build("", ObjectKind::File).is_err());
    /// assert!(PathSpec::build("/x", ObjectKind::File).is_err());
    /// ```
    pub fn build(path: &str, kind: ObjectKind) -> Result<Self> {
        if path.starts_with(['/', '\\']) {
            exn::bail!(ErrorKind::InvalidPath(path.to_string()));
        }
        let spec = match kind {
            ObjectKind::File if path.is_empty() => exn::bail!(ErrorKind::InvalidPath(path.to_string())),
            ObjectKind::File => format!("{TOP_GLOB}{path}"),
            ObjectKind::Directory if path.is_empty() => format!("{TOP_GLOB}*"),
            ObjectKind::Directory => format!("{TOP_GLOB}{}/**", path.trim_end_matches('/')),
        };
        Ok(Self(spec))
    }

    /// Exactly one root-relative file, however odd its name.
    ///
    /// ```
    /// use filecat_git::PathSpec;
    ///
    /// assert_eq!(PathSpec::literal("csv/[draft]*.csv").unwrap().as_str(), ":(top,literal)csv/[draft]*.csv");
    /// ```
    pub fn literal(path: &str) -> Result<Self> {
        if path.is_empty() || path.starts_with(['/', '\\']) {
            exn::bail!(ErrorKind::InvalidPath(path.to_string()));
        }
        Ok(Self(format!("{TOP_LITERAL}{path}")))
    }

    /// The entire tree, including every subdirectory.
    pub fn whole_tree() -> Self {
        Self(TOP.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<OsStr> for PathSpec {
    fn as_ref(&self) -> &OsStr {
        OsStr::new(&self.0)
    }
}
