//! Stream adapters.

mod pages;

pub use crate::pages::{Pages, PagesExt};
