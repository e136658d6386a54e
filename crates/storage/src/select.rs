//! Listing filters that backends can apply while they list.

use std::fmt;
use std::path::Path;

type Filter = Box<dyn Fn(&Path) -> bool + Send + Sync>;

/// Which files a listing should yield, and how deep it needs to look.
///
/// Paths are the backend's own root-relative paths. Backends use a selector
/// to avoid work for files nobody wants: the local backend stops descending
/// past `max_depth`, the git backend only queries history for selected
/// files. A backend that can't use it still honours it by filtering its
/// plain listing.
///
/// # Examples
///
/// ```
/// use filecat_storage::Selector;
/// use std::path::Path;
///
/// let selector = Selector::new(|path| path.extension().is_some_and(|ext| ext == "csv")).with_max_depth(2);
/// assert!(selector.matches(Path::new("csv/a.csv")));
/// assert!(!selector.matches(Path::new("csv/a.json")));
/// assert!(!selector.matches(Path::new("met_csv/A801/a.csv")));
/// assert!(selector.descends_into(Path::new("csv")));
/// assert!(!selector.descends_into(Path::new("met_csv/A801")));
/// ```
pub struct Selector {
    filter: Filter,
    max_depth: Option<usize>,
}

impl Selector {
    pub fn new(filter: impl Fn(&Path) -> bool + Send + Sync + 'static) -> Self {
        Self {
            filter: Box::new(filter),
            max_depth: None,
        }
    }

    /// Every file, at any depth.
    pub fn all() -> Self {
        Self::new(|_| true)
    }

    /// No selected file has more than `depth` path components.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Whether the file at `path` is wanted.
    pub fn matches(&self, path: &Path) -> bool {
        self.within_depth(path.components().count()) && (self.filter)(path)
    }

    /// Whether anything below the directory at `path` can be wanted.
    pub fn descends_into(&self, path: &Path) -> bool {
        self.within_depth(path.components().count() + 1)
    }

    fn within_depth(&self, depth: usize) -> bool {
        self.max_depth.is_none_or(|max| depth <= max)
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector").field("max_depth", &self.max_depth).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_has_no_limit() {
        let selector = Selector::all();
        assert_eq!(selector.max_depth(), None);
        assert!(selector.matches(Path::new("a/b/c/d/e.txt")));
        assert!(selector.descends_into(Path::new("a/b/c/d")));
    }

    #[test]
    fn test_depth_limit() {
        let selector = Selector::all().with_max_depth(1);
        assert!(selector.matches(Path::new("sample.txt")));
        assert!(!selector.matches(Path::new("csv/a.csv")));
        assert!(!selector.descends_into(Path::new("csv")));
        assert!(selector.descends_into(Path::new("")));
    }
}
