//! Chunked enumeration: listed entries become [`FileItem`]s, grouped into
//! pages.

use crate::error::{ErrorKind, Result};
use crate::glob::{self, GlobPattern};
use crate::item::FileItem;
use crate::location::file_url;
use crate::resolve::Resolved;
use async_stream::stream;
use exn::ResultExt;
use filecat_asyncutils::PagesExt;
use futures::stream::FusedStream;
use std::num::NonZeroUsize;

/// A batch of items in listing order. Never empty.
pub type Page = Vec<FileItem>;

pub(crate) fn page_size(size: usize) -> Result<NonZeroUsize> {
    let Some(size) = NonZeroUsize::new(size) else {
        exn::bail!(ErrorKind::InvalidConfiguration("page size must be positive".to_string()));
    };
    Ok(size)
}

/// Enumerate the files under a resolved root that match `pattern`, in pages
/// of `page_size` items.
///
/// Nothing happens until the returned stream is polled; it is then pulled
/// one entry at a time, and with `extract_content` each file is read in full
/// before the next is listed. The stream is single-use. It ends after the
/// first error, which is never followed by a partial page.
///
/// # Errors
///
/// [`InvalidConfiguration`](ErrorKind::InvalidConfiguration) if `page_size`
/// is zero; no backend call is made. Errors while listing, or
/// [`ContentRead`](ErrorKind::ContentRead) when extraction fails, come
/// through the stream.
pub fn enumerate(
    resolved: Resolved,
    pattern: GlobPattern,
    page_size: usize,
    extract_content: bool,
) -> Result<impl FusedStream<Item = Result<Page>> + Send + 'static> {
    let size = self::page_size(page_size)?;
    let Resolved { handle, root, location } = resolved;
    tracing::info!(%location, pattern = pattern.as_str(), page_size, extract_content, "Enumerating files");

    let items = stream! {
        let mut count = 0usize;
        for await entry in glob::list(handle.clone(), root, pattern) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    yield Err(err);
                    return;
                },
            };
            let content = if extract_content {
                let path = &entry.info.path;
                match handle.read(path).await.or_raise(|| ErrorKind::ContentRead(path.clone())) {
                    Ok(content) => Some(content),
                    Err(err) => {
                        yield Err(err);
                        return;
                    },
                }
            } else {
                None
            };
            count += 1;
            yield Ok(FileItem {
                file_url: file_url(&location, &entry.relative),
                path: entry.relative,
                size: entry.info.size,
                modified_at: entry.info.modified,
                content,
            });
        }
        tracing::info!(%location, items = count, pages = count.div_ceil(size.get()), "Enumeration finished");
    };
    Ok(items.pages(size))
}
