//! Parsing of `git ls-tree -r -l -z --full-tree` output.

use crate::error::{ErrorKind, Result};

/// A file (blob) in the tree of a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Root-relative path, `/`-separated.
    pub path: String,
    /// Blob size in bytes.
    pub size: u64,
    /// Object id of the blob.
    pub oid: String,
}

/// Parse NUL-separated long-format tree output, keeping blobs only.
///
/// Records look like `<mode> SP <type> SP <oid> SP+ <size> TAB <path> NUL`.
/// Submodules (`commit`) and trees never describe a readable file and are
/// skipped.
pub(crate) fn parse(raw: &[u8]) -> Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();
    for record in raw.split(|byte| *byte == 0).filter(|record| !record.is_empty()) {
        let record = std::str::from_utf8(record)
            .map_err(|_| ErrorKind::MalformedTree(String::from_utf8_lossy(record).into_owned()))?;
        let Some((meta, path)) = record.split_once('\t') else {
            exn::bail!(ErrorKind::MalformedTree(record.to_string()));
        };
        let mut fields = meta.split_whitespace();
        let (Some(_mode), Some(kind), Some(oid), Some(size)) = (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            exn::bail!(ErrorKind::MalformedTree(record.to_string()));
        };
        if kind != "blob" {
            continue;
        }
        let size = size.parse::<u64>().map_err(|_| ErrorKind::MalformedTree(record.to_string()))?;
        entries.push(TreeEntry {
            path: path.to_string(),
            size,
            oid: oid.to_string(),
        });
    }
    Ok(entries)
}
