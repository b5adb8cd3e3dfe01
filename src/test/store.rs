use async_trait::async_trait;
use parking_lot::RwLock;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use crate::prelude::*;

/// A [`BackingStore`] keeping documents in a map, counting calls and failing on demand.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs:         RwLock<HashMap<CacheKey, Document>>,
    read_calls:   AtomicUsize,
    read_refs:    AtomicUsize,
    write_calls:  AtomicUsize,
    patch_calls:  AtomicUsize,
    fail_reads:   AtomicBool,
    fail_writes:  AtomicBool,
    fail_patches: AtomicBool,
}

impl MemoryStore {
    /// Put a document directly, bypassing the counters.
    pub fn seed(&self, table: &str, doc: Document) {
        let key = doc.key_in(table).expect("seeded document needs an id");
        self.docs.write().insert(key, doc);
    }

    pub fn get(&self, table: &str, id: &str) -> Option<Document> {
        self.docs.read().get(&CacheKey::new(table, id)).cloned()
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    /// Total number of refs requested over all reads.
    pub fn read_refs(&self) -> usize {
        self.read_refs.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub fn patch_calls(&self) -> usize {
        self.patch_calls.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_patches(&self, fail: bool) {
        self.fail_patches.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn batch_read(&self, refs: &[DocRef]) -> Result<HashMap<CacheKey, Document>> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.read_refs.fetch_add(refs.len(), Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::store("store read refused"));
        }

        let docs = self.docs.read();
        Ok(refs
            .iter()
            .map(DocRef::key)
            .filter_map(|key| docs.get(&key).cloned().map(|doc| (key, doc)))
            .collect())
    }

    async fn batch_write(&self, writes: &[WriteSpec]) -> Result<Vec<Option<Document>>> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::store("store write refused"));
        }

        let mut docs = self.docs.write();
        writes
            .iter()
            .map(|write| -> Result<Option<Document>> {
                Ok(match &write.op {
                    WriteOp::Insert(doc) => {
                        let key = doc.key_in(&write.table)?;
                        docs.insert(key, doc.clone());
                        Some(doc.clone())
                    }
                    WriteOp::Update { id, patch } => docs.get_mut(&CacheKey::new(&write.table, id)).map(|doc| {
                        doc.apply(patch);
                        doc.clone()
                    }),
                })
            })
            .collect()
    }

    async fn apply_patch_to_table(&self, table: &str, patch: &Patch) -> Result<()> {
        self.patch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_patches.load(Ordering::SeqCst) {
            return Err(Error::store("store patch refused"));
        }

        for (_, doc) in self.docs.write().iter_mut().filter(|(key, _)| key.belongs_to(table)) {
            doc.apply(patch);
        }
        Ok(())
    }
}
