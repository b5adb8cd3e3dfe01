//! # rwt-cache
//!
//! Two-tier read-through/write-through cache for per-id document lookups in front of a slower, authoritative document
//! store.
//!
//! # The Basics
//!
//! The crate is designed for the following use case:
//!
//! - Documents are JSON objects grouped in tables and addressed by `(table, id)`.
//! - The authoritative store supports batched reads and writes but answers slowly.
//! - A fast expiring key-value cache (in-process [moka](https://crates.io/crates/moka) or a Redis server) sits in
//!   front of it.
//!
//! The cache operates on the following principles:
//!
//! - The store is always the system of record; cached entries are disposable, TTL-bounded copies.
//! - Every cached document lives under the key `<table>:<id>` with the same fixed TTL.
//! - A batch read costs one cache round trip plus, when anything is missing, one store round trip, whatever the mix of
//!   tables in the batch.
//! - Fully async. No locks guard cache entries.
//!
//! # Coordinator
//!
//! [`Coordinator`] is the piece that does the work. It is generic over two collaborators: a [`BackingStore`] that
//! wraps the authoritative store, and a [`FastCache`]. Both are traits, so any store and any expiring key-value cache
//! can be plugged in.
//!
//! - **Reads** ([`Coordinator::read`]) split the requested keys into cache hits and misses, fetch all misses from the
//!   store in a single batch, and return documents in request order. Fetched documents are written into the cache by a
//!   detached task unless [`Population::Synchronous`] is configured.
//! - **Writes** ([`Coordinator::write`]) go to the store first. Only the documents the store actually produced are
//!   mirrored into the cache, and the call waits for that mirror.
//! - **Table updates** ([`Coordinator::apply_to_table`]) patch the store and then every cached document of the table,
//!   scanning the cache one page of keys at a time.
//!
//! A failed round trip to either collaborator fails the whole call; nothing is retried and no partial result is
//! made up. Missing documents and no-op writes are `None` slots, not errors.

pub mod config;
pub mod coordinator;
pub mod document;
pub mod error;
pub mod key;
pub mod moka_cache;
#[cfg(feature = "redis")]
pub mod redis_cache;
pub mod scan;
pub mod traits;
pub mod types;

#[doc(inline)]
pub use coordinator::Coordinator;
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use moka_cache::MokaCache;
#[cfg(feature = "redis")]
#[doc(inline)]
pub use redis_cache::RedisCache;
#[doc(inline)]
pub use traits::{BackingStore, FastCache};
#[doc(inline)]
pub use types::Population;

pub mod prelude {
    pub use crate::config::CacheConfig;
    pub use crate::coordinator::Coordinator;
    pub use crate::document::{Document, Patch};
    pub use crate::error::{Error, Result};
    pub use crate::key::{CacheKey, DocRef};
    pub use crate::traits::{BackingStore, FastCache, InvalidationListener, Observer};
    pub use crate::types::*;
}
