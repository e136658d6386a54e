//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, a read-only capability
//! interface over every place files can be catalogued from: a directory on
//! local disk, an S3-compatible bucket, or the tree of a git reference.

mod git;
mod local;
#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "s3")]
mod s3;

pub use self::git::GitBackend;
pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::{MOCK_MODIFIED, MockBackend};
#[cfg(feature = "s3")]
pub use self::s3::S3Backend;
use crate::error::Result;
use crate::file::FileInfo;
use crate::select::Selector;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt, future};
use std::io::Read;
use std::path::Path;
use std::pin::Pin;

pub type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;
pub type BoxSyncRead = Box<dyn Read + Send + 'static>;

/// Unified, read-only interface for storage backends.
///
/// All operations are asynchronous; the only suspension points are the
/// backend's own I/O (directory reads, HTTP requests, `git` invocations).
///
/// # Path Handling
/// All paths are relative to the backend root and are validated with
/// [`validate_path`](crate::validate_path) before use. A path that escapes
/// the root is [`InvalidPath`](crate::error::ErrorKind::InvalidPath).
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use filecat_storage::{backend::StorageBackend, error::Result};
///
/// async fn size_of_sample(backend: &dyn StorageBackend) -> Result<u64> {
///     let path = PathBuf::from("sample.txt");
///     if backend.exists(&path).await? {
///         Ok(backend.stat(&path).await?.size)
///     } else {
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the backend, for logging only.
    fn name(&self) -> &str;

    /// List all files matching an optional prefix.
    ///
    /// Default implementation collects [`list_stream()`](Self::list_stream)
    /// into a [`Vec`].
    async fn list(&self, prefix: Option<&Path>) -> Result<Vec<FileInfo>> {
        self.list_stream(prefix).try_collect().await
    }

    /// Stream file metadata matching an optional prefix.
    ///
    /// Yields every file at or below `prefix` (component-wise, so prefix
    /// `csv` matches `csv/a.csv` but not `csv2/a.csv`), in the backend's
    /// natural order. Ordering is **not** a guarantee: local directories are
    /// walked depth-first, buckets are listed by key, git trees in tree
    /// order.
    ///
    /// A prefix that does not exist yields nothing rather than an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// use std::path::Path;
    /// # use filecat_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut stream = backend.list_stream(Some(Path::new("csv")));
    /// while let Some(info) = stream.try_next().await? {
    ///     println!("{}: {} bytes, modified {}", info.path.display(), info.size, info.modified);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a>;

    /// Stream the files under `prefix` that `selector` wants.
    ///
    /// Yields what [`list_stream()`](Self::list_stream) would, minus the
    /// unselected files and any errors met only while looking at them.
    /// Backends override this to skip work for those files; the default
    /// filters the full listing.
    fn select_stream<'a>(&'a self, prefix: Option<&'a Path>, selector: &'a Selector) -> FileInfoStream<'a> {
        Box::pin(self.list_stream(prefix).try_filter(|info| future::ready(selector.matches(&info.path))))
    }

    /// Check if a file exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// # use filecat_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let data = backend.read(Path::new("sample.txt")).await?;
    /// println!("Read {} bytes", data.len());
    /// # Ok(())
    /// # }
    /// ```
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Open a file for streaming reads.
    ///
    /// Returns a `'static` boxed [`Read`](std::io::Read) suitable for use
    /// inside [`spawn_blocking`](tokio::task::spawn_blocking). Opening
    /// happens before returning, so a missing file is reported here as
    /// [`NotFound`](crate::error::ErrorKind::NotFound).
    async fn reader(&self, path: &Path) -> Result<BoxSyncRead>;

    /// Get file metadata without reading contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn stat(&self, path: &Path) -> Result<FileInfo>;
}
