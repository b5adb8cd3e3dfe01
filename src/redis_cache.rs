//! [`FastCache`] over a Redis server.
//!
//! Entries are plain string keys holding JSON text with a millisecond expiry (`SET key value PX ttl`). Batched writes
//! go through a single atomic pipeline. Prefix scans use `SCAN ... MATCH <prefix>* COUNT <page_size>`; the cursor loop
//! runs in its own task and hands pages over a channel with room for one page, so it never gets more than a page
//! ahead of the consumer.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};
use std::time::Duration;
use tokio::sync::{mpsc, OnceCell};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{trace, warn};

use crate::{
    error::{Error, Result},
    key::CacheKey,
    scan::glob_escape,
    traits::FastCache,
    types::KeyPages,
};

pub struct RedisCache {
    client:     Client,
    connection: OnceCell<ConnectionManager>,
}

impl RedisCache {
    /// Connection is established lazily on the first command.
    pub fn open(connection_info: &str) -> Result<Self> {
        Ok(Self {
            client:     Client::open(connection_info).map_err(Error::cache)?,
            connection: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        let manager = self
            .connection
            .get_or_try_init(|| {
                trace!("Initialize new redis connection manager");
                self.client.get_connection_manager()
            })
            .await
            .map_err(Error::cache)?;
        Ok(manager.clone())
    }
}

#[async_trait]
impl FastCache for RedisCache {
    async fn multi_get(&self, keys: &[CacheKey]) -> Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut con = self.connection().await?;
        let keys = keys.iter().map(CacheKey::as_str).collect::<Vec<_>>();
        redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut con)
            .await
            .map_err(Error::cache)
    }

    async fn multi_set_with_ttl(&self, entries: Vec<(CacheKey, String)>, ttl: Duration) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut con = self.connection().await?;
        let ttl_ms = px_millis(ttl);
        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, body) in &entries {
            pipe.cmd("SET").arg(key.as_str()).arg(body).arg("PX").arg(ttl_ms).ignore();
        }
        pipe.query_async::<()>(&mut con).await.map_err(Error::cache)
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        let mut con = self.connection().await?;
        let deleted: i64 = redis::cmd("DEL")
            .arg(key.as_str())
            .query_async(&mut con)
            .await
            .map_err(Error::cache)?;
        Ok(deleted > 0)
    }

    async fn scan_by_prefix(&self, prefix: &str, page_size: usize) -> Result<KeyPages> {
        let mut con = self.connection().await?;
        let pattern = format!("{}*", glob_escape(prefix));
        let (tx, rx) = mpsc::channel(1);

        tokio::spawn(async move {
            let mut cursor: u64 = 0;
            loop {
                let step: redis::RedisResult<(u64, Vec<String>)> = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(page_size)
                    .query_async(&mut con)
                    .await;

                let (next, raw_keys) = match step {
                    Ok(step) => step,
                    Err(err) => {
                        let _ = tx.send(Err(Error::cache(err))).await;
                        break;
                    }
                };

                let keys = raw_keys
                    .into_iter()
                    .filter_map(|raw| match CacheKey::from_raw(raw) {
                        Ok(key) => Some(key),
                        Err(err) => {
                            warn!("skipping foreign key in scan of '{pattern}': {err}");
                            None
                        }
                    })
                    .collect::<Vec<_>>();

                // A closed receiver means the consumer stopped pulling.
                if !keys.is_empty() && tx.send(Ok(keys)).await.is_err() {
                    break;
                }

                if next == 0 {
                    break;
                }
                cursor = next;
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

// `PX 0` is rejected by the server.
fn px_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_millisecond_ttl_is_clamped() {
        assert_eq!(px_millis(Duration::ZERO), 1);
        assert_eq!(px_millis(Duration::from_micros(400)), 1);
        assert_eq!(px_millis(Duration::from_millis(1500)), 1500);
    }
}
