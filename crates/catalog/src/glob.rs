//! Glob-based listing.
//!
//! Patterns are fnmatch-style and matched against paths relative to the
//! effective root: `*` stays within one path segment, `**` spans any number
//! of them. The same matcher is applied to every backend, so equivalent
//! trees give equivalent results whatever stores them.

use crate::error::{ErrorKind, Result};
use async_stream::stream;
use filecat_storage::{BackendHandle, FileInfo, Selector, path_to_slash};
use futures::{Stream, StreamExt};
use globset::{GlobBuilder, GlobMatcher};
use std::path::{Component, Path, PathBuf};

/// Pattern used when none is given: every file directly under the root.
pub const DEFAULT_PATTERN: &str = "*";

const META: [char; 5] = ['*', '?', '[', '{', '\\'];
/// Syntax that can match across separators: recursive wildcards and negated
/// classes.
const UNBOUNDED: [&str; 3] = ["**", "[!", "[^"];

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    raw: String,
    matcher: GlobMatcher,
    prefix: String,
    depth: Option<usize>,
}

impl GlobPattern {
    /// Compile `pattern`, or [`DEFAULT_PATTERN`] if `None`.
    ///
    /// # Errors
    ///
    /// [`InvalidPattern`](ErrorKind::InvalidPattern) if the pattern is empty,
    /// absolute, climbs out of the root with `..`, or does not compile.
    ///
    /// # Examples
    ///
    /// ```
    /// use filecat_catalog::GlobPattern;
    ///
    /// let pattern = GlobPattern::new(Some("met_csv/*/*.csv")).unwrap();
    /// assert!(pattern.is_match("met_csv/A801/A881_20230920.csv"));
    /// assert!(!pattern.is_match("met_csv/A801/deeper/A881_20230920.csv"));
    /// assert_eq!(pattern.literal_prefix(), "met_csv");
    /// ```
    pub fn new(pattern: Option<&str>) -> Result<Self> {
        let raw = pattern.unwrap_or(DEFAULT_PATTERN);
        if raw.is_empty() {
            exn::bail!(ErrorKind::InvalidPattern("pattern is empty".to_string()));
        }
        if raw.starts_with('/') {
            exn::bail!(ErrorKind::InvalidPattern(format!("{raw:?} is absolute")));
        }
        if Path::new(raw).components().any(|c| c == Component::ParentDir) {
            exn::bail!(ErrorKind::InvalidPattern(format!("{raw:?} leaves the root")));
        }
        let glob = GlobBuilder::new(raw)
            .literal_separator(true)
            .build()
            .map_err(|err| ErrorKind::InvalidPattern(err.to_string()))?;
        Ok(Self {
            raw: raw.to_string(),
            matcher: glob.compile_matcher(),
            prefix: Self::prefix_of(raw),
            depth: Self::depth_of(raw),
        })
    }

    /// Most path segments a match can have, if bounded. Only a `/` in the
    /// pattern can match a separator, so a match has at most one segment
    /// more than the pattern has `/`s.
    fn depth_of(raw: &str) -> Option<usize> {
        if UNBOUNDED.iter().any(|syntax| raw.contains(syntax)) {
            return None;
        }
        Some(raw.matches('/').count() + 1)
    }

    /// Leading directory segments free of glob syntax. Everything the
    /// pattern can match lives under this directory.
    fn prefix_of(raw: &str) -> String {
        let segments: Vec<&str> = raw.split('/').collect();
        let Some((_file, directories)) = segments.split_last() else {
            return String::new();
        };
        directories
            .iter()
            .take_while(|segment| !segment.contains(META))
            .filter(|segment| !segment.is_empty() && **segment != ".")
            .copied()
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn literal_prefix(&self) -> &str {
        &self.prefix
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.depth
    }

    /// Match a root-relative, `/`-separated path.
    pub fn is_match(&self, relative: &str) -> bool {
        self.matcher.is_match(relative)
    }

    /// A backend-side filter equivalent to this pattern under `root`. Paths
    /// outside `root` are let through for the lister to report.
    fn selector(&self, root: &Path) -> Selector {
        let matcher = self.matcher.clone();
        let owned_root = root.to_path_buf();
        let selector = Selector::new(move |path| match relative_to(path, &owned_root) {
            Ok(relative) => matcher.is_match(relative),
            Err(_) => true,
        });
        match self.depth {
            Some(depth) => selector.with_max_depth(root.components().count() + depth),
            None => selector,
        }
    }
}

/// One listed file that matched the pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    /// Metadata as reported by the backend; `info.path` is relative to the
    /// backend's own root.
    pub info: FileInfo,
    /// Path relative to the effective root, `/`-separated.
    pub relative: String,
}

/// Lazily list the files under `root` in `handle` that match `pattern`.
///
/// Only the pattern's literal prefix is asked of the backend, along with a
/// [`Selector`] so the backend can skip unmatched files and, for patterns
/// without `**`, directories too deep to hold a match. Everything the
/// backend returns is then filtered with the pattern again. Entries come out
/// in the backend's own order. The first backend error ends the stream.
pub fn list(
    handle: BackendHandle,
    root: PathBuf,
    pattern: GlobPattern,
) -> impl Stream<Item = Result<RawEntry>> + Send + 'static {
    stream!({
        let prefix = root.join(pattern.literal_prefix());
        let selector = pattern.selector(&root);
        tracing::debug!(
            backend = handle.name(),
            root = %root.display(),
            pattern = pattern.as_str(),
            max_depth = ?selector.max_depth(),
            "Listing files"
        );
        let mut files = handle.select_stream(Some(prefix.as_path()), &selector);
        while let Some(info) = files.next().await {
            let info = match info {
                Ok(info) => info,
                Err(err) => {
                    yield Err(ErrorKind::storage(err));
                    return;
                },
            };
            let relative = match relative_to(&info.path, &root) {
                Ok(relative) => relative,
                Err(err) => {
                    yield Err(err);
                    return;
                },
            };
            if pattern.is_match(&relative) {
                yield Ok(RawEntry { info, relative });
            } else {
                tracing::trace!(path = %relative, "Skipping unmatched file");
            }
        }
    })
}

fn relative_to(path: &Path, root: &Path) -> Result<String> {
    let Ok(relative) = path.strip_prefix(root) else {
        exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
    };
    path_to_slash(relative).map_err(ErrorKind::storage)
}
