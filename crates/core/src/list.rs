//! Prefix listing
//!
//! Enumerates objects under a prefix as a lazy stream. Pages are fetched only
//! when the consumer asks for more items; the first failed page ends the
//! stream with that error.

use futures::stream::{self, Stream, TryStreamExt};

use crate::error::{Error, Result};
use crate::path::RemotePath;
use crate::traits::{ListOptions, ObjectInfo, ObjectStore};

enum Page {
    First,
    Next(String),
    Done,
}

async fn fetch_page(
    store: &dyn ObjectStore,
    prefix: &RemotePath,
    page_size: Option<i32>,
    page: Page,
) -> Result<Option<(Vec<ObjectInfo>, Page)>> {
    let continuation_token = match page {
        Page::Done => return Ok(None),
        Page::First => None,
        Page::Next(token) => Some(token),
    };

    let options = ListOptions {
        max_keys: page_size,
        continuation_token,
    };
    let result = store.list_objects(prefix, options).await?;
    tracing::debug!(
        bucket = %prefix.bucket,
        items = result.items.len(),
        truncated = result.truncated,
        "Fetched listing page"
    );

    let next = match result.continuation_token {
        Some(token) if result.truncated => Page::Next(token),
        _ => Page::Done,
    };

    Ok(Some((result.items, next)))
}

/// Stream every object whose key starts with `prefix.key`, in service order
pub fn list_prefix<'a>(
    store: &'a dyn ObjectStore,
    prefix: &'a RemotePath,
    page_size: Option<i32>,
) -> impl Stream<Item = Result<ObjectInfo>> + 'a {
    stream::try_unfold(Page::First, move |page| {
        fetch_page(store, prefix, page_size, page)
    })
    .map_ok(|items| stream::iter(items.into_iter().map(Ok::<ObjectInfo, Error>)))
    .try_flatten()
}

/// Render one listing line: `<size> <RFC 3339 time> <name>`
pub fn format_entry(info: &ObjectInfo) -> String {
    let modified = info
        .last_modified
        .map(|ts| ts.strftime("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| "-".to_string());

    format!("{} {} {}", info.size_human, modified, info.key)
}
