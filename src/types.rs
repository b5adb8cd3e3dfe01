use std::collections::BTreeSet;
use std::pin::Pin;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio_stream::Stream;

use crate::document::{Document, Patch};
use crate::error::Result;
use crate::key::CacheKey;

/// Pages of keys produced by [`FastCache::scan_by_prefix`](crate::traits::FastCache::scan_by_prefix). The stream is
/// pulled one page at a time; a producer must not run ahead by more than a page.
pub type KeyPages = Pin<Box<dyn Stream<Item = Result<Vec<CacheKey>>> + Send + 'static>>;

#[derive(Clone, Debug, PartialEq)]
pub enum WriteOp {
    /// Create the document or overwrite it as a whole.
    Insert(Document),
    /// Shallow patch of an existing document. Targeting a missing id is a no-op.
    Update { id: String, patch: Patch },
}

#[derive(Clone, Debug, PartialEq)]
pub struct WriteSpec {
    pub table: String,
    pub op:    WriteOp,
}

impl WriteSpec {
    pub fn insert(table: impl Into<String>, document: Document) -> Self {
        Self {
            table: table.into(),
            op:    WriteOp::Insert(document),
        }
    }

    pub fn update(table: impl Into<String>, id: impl Into<String>, patch: Patch) -> Self {
        Self {
            table: table.into(),
            op:    WriteOp::Update { id: id.into(), patch },
        }
    }
}

/// How documents fetched from the store on a read miss get into the fast cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Population {
    /// Detached task; the read returns without waiting for it.
    #[default]
    Background,
    /// The read waits for the population round trip.
    Synchronous,
}

/// Result of [`Coordinator::apply_to_table`](crate::Coordinator::apply_to_table).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TablePatchOutcome {
    /// Pages pulled from the scan and fully rewritten.
    pub pages:   usize,
    /// Cached documents patched and written back.
    pub patched: usize,
    /// Scanned keys whose value expired before it could be read or did not decode.
    pub skipped: usize,
}

/// Tables for which invalidation tracking has been requested. Only ever grows.
#[derive(Debug, Default)]
pub struct TableSet {
    tables: RwLock<BTreeSet<String>>,
}

impl TableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the tables, returning those not seen before.
    pub(crate) fn insert_new<'a>(&self, tables: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let candidates = {
            let known = self.tables.read();
            tables
                .into_iter()
                .filter(|t| !known.contains(*t))
                .map(str::to_string)
                .collect::<BTreeSet<_>>()
        };

        if candidates.is_empty() {
            return Vec::new();
        }

        // Another task may have added some of them in between.
        let mut known = self.tables.write();
        candidates.into_iter().filter(|t| known.insert(t.clone())).collect()
    }

    pub fn contains(&self, table: &str) -> bool {
        self.tables.read().contains(table)
    }

    pub fn len(&self) -> usize {
        self.tables.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.tables.read().iter().cloned().collect()
    }
}
