pub mod backend;
pub mod error;
mod file;
mod path;
mod select;

pub use crate::backend::StorageBackend;
pub use crate::file::FileInfo;
pub use crate::path::{to_slash as path_to_slash, validate as validate_path, validate_prefix};
pub use crate::select::Selector;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
