//! Git-history storage backend.
//!
//! Presents the tree of one reference (branch, tag or commit) in a local
//! repository as a read-only filesystem. Listings come from the tree at the
//! reference; modification times come from the history instead of the
//! filesystem: each file's `modified` is the author time of the most recent
//! non-merge commit that touched it.

use crate::backend::{BoxSyncRead, FileInfoStream};
use crate::error::{ErrorKind, Result};
use crate::path::{to_slash, validate as validate_path, validate_prefix};
use crate::{FileInfo, Selector, StorageBackend};
use async_stream::stream;
use async_trait::async_trait;
use filecat_git::{Git, ObjectKind, RevisionMap, TreeEntry};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// Above this many selected files, one scoped history query is cheaper than
/// naming each file.
const MAX_NAMED_FILES: usize = 64;

/// Read-only view of a git reference.
///
/// # Examples
///
/// ```no_run
/// use filecat_storage::backend::GitBackend;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = GitBackend::open("samples", "/srv/repos/samples", "v1.2.0").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GitBackend {
    name: String,
    git: Git,
    reference: String,
}

impl GitBackend {
    /// Open the repository at `repo` and pin it to `reference`.
    ///
    /// # Errors
    ///
    /// - [`RevisionQuery`](ErrorKind::RevisionQuery) if no `git` executable
    ///   can be found.
    /// - [`Unavailable`](ErrorKind::Unavailable) if `repo` isn't a repository
    ///   or `reference` doesn't name a commit in it.
    pub async fn open(name: impl Into<String>, repo: impl Into<PathBuf>, reference: impl Into<String>) -> Result<Self> {
        let git = Git::discover(repo).map_err(ErrorKind::git)?;
        Self::with_git(name, git, reference).await
    }

    /// Like [`open()`](Self::open), with an already located `git`.
    pub async fn with_git(name: impl Into<String>, git: Git, reference: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let reference = reference.into();
        if let Err(err) = git.verify_reference(&reference).await {
            let message = format!("{}: {reference:?} is not a commit", git.repo().display());
            return Err(err.raise(ErrorKind::Unavailable(message)));
        }
        tracing::debug!(backend = %name, repo = %git.repo().display(), %reference, "Opened git backend");
        Ok(Self { name, git, reference })
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Revisions for the `selected` entries of a listing of `listed` files.
    ///
    /// A strict, small selection is queried by name. Otherwise, without a
    /// prefix, one whole-tree query. With a prefix, one query scoped to it:
    /// as a file if the prefix names exactly one file, else as a directory
    /// (recursive).
    async fn revisions_for(&self, prefix: Option<&str>, listed: usize, selected: &[TreeEntry]) -> Result<RevisionMap> {
        let revisions = match prefix {
            _ if selected.len() < listed && selected.len() <= MAX_NAMED_FILES => {
                let paths: Vec<&str> = selected.iter().map(|entry| entry.path.as_str()).collect();
                self.git.revisions_of(&self.reference, &paths).await
            },
            None => self.git.revisions_all(&self.reference).await,
            Some(prefix) => {
                let kind = match selected {
                    [only] if only.path == prefix => ObjectKind::File,
                    _ => ObjectKind::Directory,
                };
                self.git.revisions(&self.reference, prefix, kind).await
            },
        };
        revisions.map_err(ErrorKind::git)
    }

    fn file_info(entry: &TreeEntry, revisions: &RevisionMap) -> Result<FileInfo> {
        let Some(at) = revisions.get(&entry.path) else {
            // Tracked, but only ever introduced by a merge commit.
            exn::bail!(ErrorKind::MalformedHistory);
        };
        let Ok(modified) = OffsetDateTime::from_unix_timestamp(at) else {
            exn::bail!(ErrorKind::MalformedHistory);
        };
        Ok(FileInfo::new(validate_path(&entry.path)?, entry.size, modified))
    }

    /// Listing shared by [`list_stream()`](StorageBackend::list_stream) and
    /// [`select_stream()`](StorageBackend::select_stream). History is only
    /// queried for selected files.
    fn listing<'a>(&'a self, prefix: Option<&'a Path>, selector: Option<&'a Selector>) -> FileInfoStream<'a> {
        let prefix = match validate_prefix(prefix).and_then(|pfx| pfx.as_deref().map(to_slash).transpose()) {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };

        Box::pin(stream! {
            let mut entries = match self.git.ls_tree(&self.reference, prefix.as_deref()).await {
                Ok(entries) => entries,
                Err(err) => { yield Err(ErrorKind::git(err)); return; },
            };
            let listed = entries.len();
            if let Some(selector) = selector {
                entries.retain(|entry| selector.matches(Path::new(&entry.path)));
            }
            if entries.is_empty() {
                return;
            }
            let revisions = match self.revisions_for(prefix.as_deref(), listed, &entries).await {
                Ok(revisions) => revisions,
                Err(err) => { yield Err(err); return; },
            };
            tracing::debug!(
                backend = %self.name,
                prefix = ?prefix,
                listed,
                selected = entries.len(),
                revisions = revisions.len(),
                "Listed git tree"
            );
            for entry in &entries {
                yield Self::file_info(entry, &revisions);
            }
        })
    }

    /// The tree entry for exactly `path`, if it is a file at the reference.
    async fn entry(&self, path: &Path) -> Result<Option<TreeEntry>> {
        let path = to_slash(&validate_path(path)?)?;
        let entries = self.git.ls_tree(&self.reference, Some(&path)).await.map_err(ErrorKind::git)?;
        Ok(entries.into_iter().find(|entry| entry.path == path))
    }
}

#[async_trait]
impl StorageBackend for GitBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        self.listing(prefix, None)
    }

    fn select_stream<'a>(&'a self, prefix: Option<&'a Path>, selector: &'a Selector) -> FileInfoStream<'a> {
        self.listing(prefix, Some(selector))
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(self.entry(path).await?.is_some())
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let Some(entry) = self.entry(path).await? else {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        };
        self.git.read_blob(&self.reference, &entry.path).await.map_err(ErrorKind::git)
    }

    async fn reader(&self, path: &Path) -> Result<BoxSyncRead> {
        Ok(Box::new(Cursor::new(self.read(path).await?)))
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let Some(entry) = self.entry(path).await? else {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        };
        let revisions =
            self.git.revisions(&self.reference, &entry.path, ObjectKind::File).await.map_err(ErrorKind::git)?;
        Self::file_info(&entry, &revisions)
    }
}
