//! In-process [`FastCache`] over [moka](https://crates.io/crates/moka).
//!
//! Values are kept with their own TTL so that every entry expires independently, the way an external key-value
//! server would treat `SET ... PX`.

use async_trait::async_trait;
use fieldx::fxstruct;
use moka::{future::Cache, policy::EvictionPolicy, Expiry};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::trace;

use crate::{error::Result, key::CacheKey, scan::pages_from_keys, traits::FastCache, types::KeyPages};

#[derive(Clone, Debug)]
struct Stored {
    body: Arc<str>,
    ttl:  Duration,
}

struct PerEntryTtl;

impl Expiry<CacheKey, Stored> for PerEntryTtl {
    fn expire_after_create(&self, _key: &CacheKey, value: &Stored, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    // Overwriting an entry restarts its clock with the new TTL.
    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &Stored,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

#[fxstruct(
    sync,
    no_new,
    builder(
        doc("Builder object of [`MokaCache`].", "", "See [`MokaCache::builder()`] method."),
        method_doc("Implement builder pattern for [`MokaCache`]."),
    )
)]
pub struct MokaCache {
    /// Cache name. Most useful for debugging and logging.
    #[fieldx(optional, get(off), builder(into))]
    name: String,

    #[fieldx(get(copy), default(100_000))]
    max_capacity: u64,

    #[fieldx(private, lazy, get(clone), builder(off))]
    cache: Arc<Cache<CacheKey, Stored>>,
}

impl MokaCache {
    fn build_cache(&self) -> Arc<Cache<CacheKey, Stored>> {
        Arc::new(
            Cache::builder()
                .max_capacity(self.max_capacity())
                .name(self.name())
                .eviction_policy(EvictionPolicy::tiny_lfu())
                .expire_after(PerEntryTtl)
                .build(),
        )
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("rwt-cache")
    }

    /// Number of live entries, after applying pending maintenance.
    pub async fn entry_count(&self) -> u64 {
        let cache = self.cache();
        cache.run_pending_tasks().await;
        cache.entry_count()
    }
}

#[async_trait]
impl FastCache for MokaCache {
    async fn multi_get(&self, keys: &[CacheKey]) -> Result<Vec<Option<String>>> {
        let cache = self.cache();
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(cache.get(key).await.map(|stored| stored.body.to_string()));
        }
        Ok(values)
    }

    async fn multi_set_with_ttl(&self, entries: Vec<(CacheKey, String)>, ttl: Duration) -> Result<()> {
        let cache = self.cache();
        trace!("[{}] storing {} entr(ies) for {ttl:?}", self.name(), entries.len());
        for (key, body) in entries {
            cache
                .insert(
                    key,
                    Stored {
                        body: Arc::from(body),
                        ttl,
                    },
                )
                .await;
        }
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.cache().remove(key).await.is_some())
    }

    async fn scan_by_prefix(&self, prefix: &str, page_size: usize) -> Result<KeyPages> {
        let cache = self.cache();
        cache.run_pending_tasks().await;
        let keys = cache
            .iter()
            .filter(|(key, _)| key.as_str().starts_with(prefix))
            .map(|(key, _)| CacheKey::clone(&key))
            .collect::<Vec<_>>();
        trace!("[{}] scan of '{prefix}' matched {} key(s)", self.name(), keys.len());
        Ok(pages_from_keys(keys, page_size))
    }
}
