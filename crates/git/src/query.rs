//! Git command wrappers using [`tokio::process::Command`].
//!
//! Every method shells out to the system `git` binary. All of them are
//! read-only and idempotent; failures are reported, never retried here.

use crate::error::{ErrorKind, Result};
use crate::history::{self, RevisionMap};
use crate::pathspec::{ObjectKind, PathSpec};
use crate::tree::{self, TreeEntry};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// A repository on the local filesystem, and the `git` binary used to
/// query it.
#[derive(Debug, Clone)]
pub struct Git {
    binary: PathBuf,
    repo: PathBuf,
}

impl Git {
    /// Locate `git` on `PATH` and bind it to the repository at `repo`.
    ///
    /// Does not check that `repo` is a repository; see
    /// [`verify_reference()`](Self::verify_reference).
    pub fn discover(repo: impl Into<PathBuf>) -> Result<Self> {
        let Ok(binary) = which::which("git") else {
            tracing::info!("git executable not found in PATH");
            exn::bail!(ErrorKind::GitNotFound);
        };
        Ok(Self::with_binary(binary, repo))
    }

    pub fn with_binary(binary: impl Into<PathBuf>, repo: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            repo: repo.into(),
        }
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    /// Full history of the entire tree at `reference`, merge commits
    /// excluded, as raw text.
    pub async fn log_all(&self, reference: &str) -> Result<String> {
        self.log(reference, &[PathSpec::whole_tree()]).await
    }

    /// History at `reference` scoped to `path`, merge commits excluded, as
    /// raw text. `path` is root-relative; use `""` for the root directory.
    pub async fn log_path(&self, reference: &str, path: &str, kind: ObjectKind) -> Result<String> {
        let spec = PathSpec::build(path, kind)?;
        self.log(reference, &[spec]).await
    }

    /// History at `reference` of exactly the given root-relative files,
    /// merge commits excluded, as raw text.
    pub async fn log_files(&self, reference: &str, paths: &[&str]) -> Result<String> {
        let specs = paths.iter().map(|path| PathSpec::literal(path)).collect::<Result<Vec<_>>>()?;
        self.log(reference, &specs).await
    }

    /// [`log_all()`](Self::log_all), parsed.
    pub async fn revisions_all(&self, reference: &str) -> Result<RevisionMap> {
        history::parse(&self.log_all(reference).await?)
    }

    /// [`log_path()`](Self::log_path), parsed.
    pub async fn revisions(&self, reference: &str, path: &str, kind: ObjectKind) -> Result<RevisionMap> {
        history::parse(&self.log_path(reference, path, kind).await?)
    }

    /// [`log_files()`](Self::log_files), parsed.
    pub async fn revisions_of(&self, reference: &str, paths: &[&str]) -> Result<RevisionMap> {
        history::parse(&self.log_files(reference, paths).await?)
    }

    async fn log(&self, reference: &str, specs: &[PathSpec]) -> Result<String> {
        let mut args = vec![
            OsStr::new("log"),
            OsStr::new("--raw"),
            OsStr::new("--no-merges"),
            OsStr::new("--pretty=%at"),
            OsStr::new(reference),
            OsStr::new("--"),
        ];
        args.extend(specs.iter().map(|spec| OsStr::new(spec.as_str())));
        let output = self.run(args).await?;
        String::from_utf8(output).map_err(|_| ErrorKind::MalformedHistory("log output is not UTF-8".to_string()).into())
    }

    /// Every file in the tree at `reference`, optionally limited to those
    /// under `prefix` (a root-relative file or directory path).
    pub async fn ls_tree(&self, reference: &str, prefix: Option<&str>) -> Result<Vec<TreeEntry>> {
        let mut args = vec!["ls-tree", "-r", "-l", "-z", "--full-tree", reference];
        if let Some(prefix) = prefix {
            args.extend(["--", prefix]);
        }
        let output = self.run(args).await?;
        tree::parse(&output)
    }

    /// Contents of the blob at `path` as of `reference`.
    pub async fn read_blob(&self, reference: &str, path: &str) -> Result<Vec<u8>> {
        let object = format!("{reference}:{path}");
        self.run(["cat-file", "blob", object.as_str()]).await
    }

    /// Check that the repository exists and `reference` names a commit.
    pub async fn verify_reference(&self, reference: &str) -> Result<()> {
        let commit = format!("{reference}^{{commit}}");
        self.run(["rev-parse", "--verify", "--quiet", commit.as_str()]).await?;
        Ok(())
    }

    async fn run<I, S>(&self, args: I) -> Result<Vec<u8>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-C").arg(&self.repo);
        // Keep non-ASCII paths verbatim instead of octal-escaped and quoted.
        cmd.args(["-c", "core.quotePath=false"]);
        cmd.args(args);
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!(repo = %self.repo.display(), command = ?cmd.as_std().get_args().collect::<Vec<_>>(), "Spawning git");
        let output = match cmd.output().await {
            Ok(output) => output,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => exn::bail!(ErrorKind::GitNotFound),
            Err(err) => exn::bail!(ErrorKind::RevisionQuery(format!("failed to spawn git: {err}"))),
        };
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            exn::bail!(ErrorKind::RevisionQuery(format!("{} ({})", stderr.trim(), output.status)));
        }
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{self, FIXTURE_TIMES};

    #[tokio::test]
    async fn test_log_all() {
        let Some(dir) = fixture::repository() else { return };
        let git = Git::discover(dir.path()).unwrap();
        let raw = git.log_all("HEAD").await.unwrap();
        for path in ["file1", "file2", "inner/file3", "inner/file4"] {
            assert!(raw.contains(path), "missing {path}");
        }
    }

    #[tokio::test]
    async fn test_log_all_at_tag() {
        let Some(dir) = fixture::repository() else { return };
        let git = Git::discover(dir.path()).unwrap();
        let raw = git.log_all("thetag").await.unwrap();
        assert!(raw.contains("file1"));
        assert!(!raw.contains("file2"));
    }

    #[tokio::test]
    async fn test_log_directory() {
        let Some(dir) = fixture::repository() else { return };
        let git = Git::discover(dir.path()).unwrap();
        let raw = git.log_path("HEAD", "inner", ObjectKind::Directory).await.unwrap();
        assert!(raw.contains("inner/file3"));
        assert!(raw.contains("inner/file4"));
        assert!(!raw.contains("file2"));
    }

    #[tokio::test]
    async fn test_log_single_file() {
        let Some(dir) = fixture::repository() else { return };
        let git = Git::discover(dir.path()).unwrap();
        let raw = git.log_path("master", "file1", ObjectKind::File).await.unwrap();
        assert!(raw.contains("file1"));
        assert!(!raw.contains("file2"));
    }

    #[tokio::test]
    async fn test_log_root_at_tag() {
        let Some(dir) = fixture::repository() else { return };
        let git = Git::discover(dir.path()).unwrap();
        let raw = git.log_path("thetag", "", ObjectKind::Directory).await.unwrap();
        assert!(raw.contains("file1"));
        assert!(!raw.contains("file2"));
    }

    #[tokio::test]
    async fn test_revisions_of_selected_files() {
        let Some(dir) = fixture::repository() else { return };
        fixture::commit(dir.path(), 1703560000, &[("odd\"name.txt", b"q"), ("inner/[x].txt", b"x")]);
        let git = Git::discover(dir.path()).unwrap();
        let revisions = git.revisions_of("HEAD", &["file2", "odd\"name.txt", "inner/[x].txt"]).await.unwrap();
        assert_eq!(revisions.len(), 3);
        assert_eq!(revisions.get("file2"), Some(FIXTURE_TIMES[2]));
        assert_eq!(revisions.get("odd\"name.txt"), Some(1703560000));
        assert_eq!(revisions.get("inner/[x].txt"), Some(1703560000));
        assert!(!revisions.contains("inner/file3"));
    }

    #[tokio::test]
    async fn test_revisions_all() {
        let Some(dir) = fixture::repository() else { return };
        let git = Git::discover(dir.path()).unwrap();
        let revisions = git.revisions_all("HEAD").await.unwrap();
        assert_eq!(revisions.len(), 4);
        assert_eq!(revisions.get("file1"), Some(FIXTURE_TIMES[1]));
        assert_eq!(revisions.get("file2"), Some(FIXTURE_TIMES[2]));
        assert_eq!(revisions.get("inner/file3"), Some(FIXTURE_TIMES[3]));
        assert_eq!(revisions.get("inner/file4"), Some(FIXTURE_TIMES[3]));
    }

    #[tokio::test]
    async fn test_unknown_reference() {
        let Some(dir) = fixture::repository() else { return };
        let git = Git::discover(dir.path()).unwrap();
        let err = git.log_all("somenonexistentgitref").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::RevisionQuery(_)));
        let err = git.verify_reference("somenonexistentgitref").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::RevisionQuery(_)));
        assert!(git.verify_reference("thetag").await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_path_fails_before_query() {
        let git = Git::with_binary("/definitely/not/git", "/nowhere");
        let err = git.log_path("HEAD", "/abs", ObjectKind::Directory).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let git = Git::with_binary("/definitely/not/git", "/nowhere");
        let err = git.log_all("HEAD").await.unwrap_err();
        assert_eq!(*err, ErrorKind::GitNotFound);
    }

    #[tokio::test]
    async fn test_ls_tree() {
        let Some(dir) = fixture::repository() else { return };
        let git = Git::discover(dir.path()).unwrap();
        let all = git.ls_tree("HEAD", None).await.unwrap();
        let paths: Vec<_> = all.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["file1", "file2", "inner/file3", "inner/file4"]);
        let inner = git.ls_tree("HEAD", Some("inner")).await.unwrap();
        assert_eq!(inner.len(), 2);
        let at_tag = git.ls_tree("thetag", None).await.unwrap();
        assert_eq!(at_tag.len(), 1);
        assert_eq!(at_tag[0].size, 6);
    }

    #[tokio::test]
    async fn test_read_blob_at_reference() {
        let Some(dir) = fixture::repository() else { return };
        let git = Git::discover(dir.path()).unwrap();
        assert_eq!(git.read_blob("HEAD", "inner/file3").await.unwrap(), b"data3");
        assert_eq!(git.read_blob("thetag", "file1").await.unwrap(), b"data00");
        assert_eq!(git.read_blob("HEAD~3", "file1").await.unwrap(), b"data0");
        assert!(git.read_blob("thetag", "file2").await.is_err());
    }
}
