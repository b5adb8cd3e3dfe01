use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::document::{Document, Patch};
use crate::error::{Error, Result};
use crate::key::{CacheKey, DocRef};
use crate::types::{KeyPages, WriteSpec};

/// The authoritative document store behind the cache.
///
/// Adapters report transport failures with [`Error::store`]. A document that does not exist is simply absent from
/// the returned map; it is not an error.
#[async_trait]
pub trait BackingStore: Send + Sync + 'static {
    async fn batch_read(&self, refs: &[DocRef]) -> Result<HashMap<CacheKey, Document>>;

    /// Must return exactly one entry per record, in input order. `None` marks a no-op, like an update of a missing
    /// document.
    async fn batch_write(&self, writes: &[WriteSpec]) -> Result<Vec<Option<Document>>>;

    async fn apply_patch_to_table(&self, table: &str, patch: &Patch) -> Result<()>;
}

/// An expiring key-value cache holding serialized documents.
///
/// Every method is a single round trip as far as the coordinator is concerned. Transport failures are reported with
/// [`Error::cache`].
#[async_trait]
pub trait FastCache: Send + Sync + 'static {
    /// One slot per key, in key order.
    async fn multi_get(&self, keys: &[CacheKey]) -> Result<Vec<Option<String>>>;

    async fn multi_set_with_ttl(&self, entries: Vec<(CacheKey, String)>, ttl: Duration) -> Result<()>;

    /// Returns `true` if an entry was removed.
    async fn delete(&self, key: &CacheKey) -> Result<bool>;

    /// Stream the keys starting with `prefix` in pages of roughly `page_size` keys. Keys may repeat across pages.
    async fn scan_by_prefix(&self, prefix: &str, page_size: usize) -> Result<KeyPages>;
}

/// Hook for cross-instance invalidation. The coordinator asks it to start tracking a table's key prefix the first time
/// it reads from that table.
#[async_trait]
pub trait InvalidationListener: Send + Sync + 'static {
    async fn track_table(&self, prefix: &str) -> Result<()>;
}

/// Receives notifications about work the coordinator does outside of the caller's view.
#[async_trait]
pub trait Observer: Send + Sync + 'static {
    /// Documents fetched on a read miss have been written into the fast cache.
    async fn on_populated(&self, _count: usize) {}
    async fn on_population_error(&self, _error: &Error) {}
    async fn on_page_patched(&self, _table: &str, _patched: usize) {}
}
