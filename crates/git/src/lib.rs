//! Make a git repository's history queryable like a filesystem.
//!
//! - [`PathSpec`] builds the path-matching expressions `git log` consumes.
//! - [`Git`] runs the (read-only) queries against one repository.
//! - [`parse_history()`] turns raw log text into a [`RevisionMap`] of each
//!   path's latest change.

pub mod error;
#[cfg(any(test, feature = "fixture"))]
pub mod fixture;
mod history;
mod pathspec;
mod query;
mod tree;

pub use crate::history::{RevisionMap, parse as parse_history};
pub use crate::pathspec::{ObjectKind, PathSpec};
pub use crate::query::Git;
pub use crate::tree::TreeEntry;
