//! Throwaway repository for tests, here and in other crates' dev
//! dependencies (feature `fixture`).

use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Author/committer dates of the fixture commits, oldest first.
pub const FIXTURE_TIMES: [i64; 4] = [1703550235, 1703550236, 1703550237, 1703550238];

fn git(dir: &Path, at: Option<i64>, args: &[&str]) {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(dir);
    cmd.args(["-c", "user.name=Test", "-c", "user.email=test@example.com"]);
    cmd.args(["-c", "commit.gpgsign=false", "-c", "tag.gpgsign=false"]);
    cmd.args(args);
    if let Some(at) = at {
        let date = format!("@{at} +0000");
        cmd.env("GIT_AUTHOR_DATE", &date).env("GIT_COMMITTER_DATE", &date);
    }
    let status = cmd.status().expect("failed to spawn git");
    assert!(status.success(), "git {args:?} failed");
}

fn write(dir: &Path, path: &str, data: &[u8]) {
    let path = dir.join(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("failed to create fixture directory");
    }
    std::fs::write(path, data).expect("failed to write fixture file");
}

/// Build a repository on branch `master` with this history, oldest first:
///
/// 1. add `file1` (`data0`)
/// 2. modify `file1` (`data00`), tagged `thetag`
/// 3. add `file2` (`data000`)
/// 4. add `inner/file3` (`data3`) and `inner/file4` (`data4`)
///
/// Returns `None` if `git` isn't on `PATH`; the calling test should return
/// early.
pub fn repository() -> Option<TempDir> {
    if which::which("git").is_err() {
        eprintln!("git not found on PATH; skipping");
        return None;
    }
    let dir = tempfile::tempdir().expect("failed to create temporary directory");
    let path = dir.path();
    git(path, None, &["-c", "init.defaultBranch=master", "init", "-q"]);
    write(path, "file1", b"data0");
    git(path, None, &["add", "file1"]);
    git(path, Some(FIXTURE_TIMES[0]), &["commit", "-q", "-m", "init"]);
    write(path, "file1", b"data00");
    git(path, Some(FIXTURE_TIMES[1]), &["commit", "-q", "-a", "-m", "tagger"]);
    git(path, Some(FIXTURE_TIMES[1]), &["tag", "-a", "thetag", "-m", "make tag"]);
    write(path, "file2", b"data000");
    git(path, None, &["add", "file2"]);
    git(path, Some(FIXTURE_TIMES[2]), &["commit", "-q", "-m", "master tip"]);
    write(path, "inner/file3", b"data3");
    write(path, "inner/file4", b"data4");
    git(path, None, &["add", "inner"]);
    git(path, Some(FIXTURE_TIMES[3]), &["commit", "-q", "-m", "branch tip"]);
    Some(dir)
}

/// Commit `files` (path, contents) into the repository at `dir` with the
/// given timestamp.
pub fn commit(dir: &Path, at: i64, files: &[(&str, &[u8])]) {
    for (path, data) in files {
        write(dir, path, data);
        git(dir, None, &["add", path]);
    }
    git(dir, Some(at), &["commit", "-q", "-m", "fixture"]);
}
