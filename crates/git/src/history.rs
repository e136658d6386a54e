//! Parsing of `git log --raw --pretty=%at` output.
//!
//! The log is newest-first. Each commit contributes one line holding its
//! author timestamp (epoch seconds), followed by zero or more raw change
//! records such as:
//!
//! ```text
//! 1703550238
//!
//! :000000 100644 0000000 cdca2c1 A	inner/file3
//! :100644 100644 1c37a15 a906852 M	file1
//! ```
//!
//! Even with `core.quotePath=false`, git quotes a path holding `"`, `\` or
//! a control character and escapes those C-style (`"odd\"name.txt"`).

use crate::error::{ErrorKind, Result};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Marks a raw change record (as opposed to a timestamp line).
const RECORD_MARKER: char = ':';
const QUOTE: char = '"';

/// Mapping from root-relative file path to the epoch timestamp of the most
/// recent non-merge commit that touched it.
///
/// Built fresh per query and immutable once returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionMap(HashMap<String, i64>);

impl RevisionMap {
    pub fn get(&self, path: &str) -> Option<i64> {
        self.0.get(path).copied()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parse raw log text into a [`RevisionMap`].
///
/// The first occurrence of a path wins: scanning newest-first, that is the
/// latest change. Blank lines are skipped. A change record seen before any
/// timestamp line, a timestamp line that isn't an integer, a change record
/// without a tab-separated path, or a badly escaped quoted path are all
/// [`MalformedHistory`](ErrorKind::MalformedHistory).
///
/// # Examples
///
/// ```
/// let raw = "300\n\n:000000 100644 0000000 aaaaaaa A\ta.txt\n200\n\n:100644 100644 aaaaaaa bbbbbbb M\ta.txt\n";
/// let revisions = filecat_git::parse_history(raw).unwrap();
/// assert_eq!(revisions.get("a.txt"), Some(300));
/// ```
pub fn parse(raw: &str) -> Result<RevisionMap> {
    let mut revisions = HashMap::new();
    let mut committed_at: Option<i64> = None;
    for (index, line) in raw.lines().enumerate() {
        let number = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !trimmed.starts_with(RECORD_MARKER) {
            let timestamp = trimmed.parse::<i64>().map_err(|_| {
                ErrorKind::MalformedHistory(format!("line {number}: expected a commit timestamp, found {trimmed:?}"))
            })?;
            committed_at = Some(timestamp);
            continue;
        }
        let Some(timestamp) = committed_at else {
            exn::bail!(ErrorKind::MalformedHistory(format!(
                "line {number}: change record before any commit timestamp"
            )));
        };
        let Some((_, path)) = line.rsplit_once('\t') else {
            exn::bail!(ErrorKind::MalformedHistory(format!("line {number}: change record has no path")));
        };
        let path = unquote(path).ok_or_else(|| {
            ErrorKind::MalformedHistory(format!("line {number}: badly quoted path {path:?}"))
        })?;
        if let Entry::Vacant(slot) = revisions.entry(path) {
            slot.insert(timestamp);
        }
    }
    tracing::trace!(paths = revisions.len(), "Parsed git history");
    Ok(RevisionMap(revisions))
}

/// Undo git's C-style path quoting. Unquoted paths are returned as is.
fn unquote(path: &str) -> Option<String> {
    let Some(inner) = path.strip_prefix(QUOTE).and_then(|rest| rest.strip_suffix(QUOTE)) else {
        return Some(path.to_string());
    };
    let mut bytes = Vec::with_capacity(inner.len());
    let mut rest = inner.as_bytes();
    while let Some((&byte, tail)) = rest.split_first() {
        rest = tail;
        if byte != b'\\' {
            bytes.push(byte);
            continue;
        }
        let (&escape, tail) = rest.split_first()?;
        rest = tail;
        let decoded = match escape {
            b'a' => 0x07,
            b'b' => 0x08,
            b't' => b'\t',
            b'n' => b'\n',
            b'v' => 0x0b,
            b'f' => 0x0c,
            b'r' => b'\r',
            b'"' | b'\\' => escape,
            // Three octal digits: one raw byte of a multi-byte character.
            b'0'..=b'3' => {
                let [high, low, tail @ ..] = rest else { return None };
                rest = tail;
                let digits = [escape, *high, *low];
                if !digits.iter().all(|digit| (b'0'..=b'7').contains(digit)) {
                    return None;
                }
                digits.iter().fold(0u8, |value, digit| (value << 3) | (digit - b'0'))
            },
            _ => return None,
        };
        bytes.push(decoded);
    }
    String::from_utf8(bytes).ok()
}
