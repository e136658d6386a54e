//! In-memory storage backend for testing.

use super::{BoxSyncRead, FileInfoStream};
use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::file::FileInfo;
use crate::path::{validate as validate_path, validate_prefix};
use async_stream::stream;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// Modification time given to every mock file: 2023-12-26T00:23:55Z.
pub const MOCK_MODIFIED: i64 = 1703550235;

/// In-memory storage backend for testing.
///
/// Files are kept in a sorted map, so listings come out in path order. The
/// backend is immutable once built. Files registered through
/// [`with_unreadable()`](Self::with_unreadable) are listed normally but fail
/// on every read, which is how content-read failures are exercised.
///
/// # Examples
///
/// ```
/// use filecat_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([
///     ("csv/freshman_kgs.csv", "Sex,Weight\n"),
/// ]);
/// assert!(backend.exists(Path::new("csv/freshman_kgs.csv")).await?);
/// assert_eq!(backend.list(None).await?.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    modified: OffsetDateTime,
    storage: BTreeMap<PathBuf, Vec<u8>>,
    unreadable: BTreeSet<PathBuf>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation. If test setup is wrong, then the
    /// test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut storage = BTreeMap::new();
        for (path, data) in files {
            storage.insert(Self::checked(path.into()), data.into());
        }
        Self {
            name: "mock".to_string(),
            modified: OffsetDateTime::from_unix_timestamp(MOCK_MODIFIED).unwrap_or(OffsetDateTime::UNIX_EPOCH),
            storage,
            unreadable: BTreeSet::new(),
        }
    }

    /// Mark a path as present but unreadable. The path is listed with size
    /// zero if it wasn't already registered.
    pub fn with_unreadable(mut self, path: impl Into<PathBuf>) -> Self {
        let path = Self::checked(path.into());
        self.storage.entry(path.clone()).or_default();
        self.unreadable.insert(path);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn checked(path: PathBuf) -> PathBuf {
        let Ok(validated) = validate_path(&path) else {
            // Deliberate: MockBackend only exists for tests.
            panic!("MockBackend: invalid path {}", path.display());
        };
        validated
    }

    fn file_info(&self, path: &Path, size: usize) -> FileInfo {
        FileInfo::new(path, size as u64, self.modified)
    }

    fn contents(&self, path: &Path) -> Result<&[u8]> {
        let path = validate_path(path)?;
        if self.unreadable.contains(&path) {
            exn::bail!(ErrorKind::PermissionDenied(path));
        }
        match self.storage.get(&path) {
            Some(data) => Ok(data.as_slice()),
            None => exn::bail!(ErrorKind::NotFound(path)),
        }
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let validated_prefix = match validate_prefix(prefix) {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };

        Box::pin(stream! {
            for (path, data) in &self.storage {
                if validated_prefix.as_ref().is_none_or(|pfx| path.starts_with(pfx)) {
                    yield Ok(self.file_info(path, data.len()));
                }
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.storage.contains_key(&path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(self.contents(path)?.to_vec())
    }

    async fn reader(&self, path: &Path) -> Result<BoxSyncRead> {
        Ok(Box::new(Cursor::new(self.contents(path)?.to_vec())))
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let path = validate_path(path)?;
        match self.storage.get(&path) {
            Some(data) => Ok(self.file_info(&path, data.len())),
            None => exn::bail!(ErrorKind::NotFound(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_files() {
        let backend = MockBackend::with_files([("csv/a.csv", "a"), ("sample.txt", "plain")]);
        assert!(backend.exists(Path::new("csv/a.csv")).await.unwrap());
        assert!(!backend.exists(Path::new("c/nope")).await.unwrap());
        assert_eq!(backend.read(Path::new("sample.txt")).await.unwrap(), b"plain");
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let backend = MockBackend::default();
        let err = backend.read(Path::new("missing.txt")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unreadable() {
        let backend = MockBackend::with_files([("a.txt", "a")]).with_unreadable("b.txt");
        assert_eq!(backend.list(None).await.unwrap().len(), 2);
        assert_eq!(backend.stat(Path::new("b.txt")).await.unwrap().size, 0);
        let err = backend.read(Path::new("b.txt")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::PermissionDenied(_)));
        assert!(backend.reader(Path::new("b.txt")).await.is_err());
    }

    #[tokio::test]
    async fn test_stat() {
        let backend = MockBackend::with_files([("file.csv", "12345")]);
        let info = backend.stat(Path::new("file.csv")).await.unwrap();
        assert_eq!(info.path, PathBuf::from("file.csv"));
        assert_eq!(info.size, 5);
        assert_eq!(info.modified.unix_timestamp(), MOCK_MODIFIED);
    }

    #[tokio::test]
    async fn test_list_sorted_with_prefix() {
        let backend = MockBackend::with_files([("csv/b.csv", "b"), ("csv/a.csv", "a"), ("csv2/c.csv", "c")]);
        let files = backend.list(Some(Path::new("csv"))).await.unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.as_path()).collect();
        assert_eq!(paths, [Path::new("csv/a.csv"), Path::new("csv/b.csv")]);
        assert_eq!(backend.list(None).await.unwrap().len(), 3);
    }

    #[test]
    #[should_panic(expected = "invalid path")]
    fn test_with_files_panics_on_bad_path() {
        MockBackend::with_files([("../escape", "bad")]);
    }
}
