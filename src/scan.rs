//! Helpers for adapters that implement [`FastCache::scan_by_prefix`](crate::traits::FastCache::scan_by_prefix).

use crate::key::CacheKey;
use crate::types::KeyPages;

/// Split an already collected key list into a page stream. Pages are materialized lazily as the stream is pulled.
pub fn pages_from_keys(keys: Vec<CacheKey>, page_size: usize) -> KeyPages {
    let page_size = page_size.max(1);
    let mut keys = keys.into_iter().peekable();
    let pages = std::iter::from_fn(move || {
        keys.peek()?;
        Some(Ok(keys.by_ref().take(page_size).collect::<Vec<_>>()))
    });
    Box::pin(tokio_stream::iter(pages))
}

/// Escape glob metacharacters so that a table name matches literally in a `MATCH` pattern.
pub fn glob_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
