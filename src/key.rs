//! Cache keys.
//!
//! Every cached document lives under a key of the form `<table>:<id>`. The table part ends at the first `:`, so table
//! names must not contain a colon while ids may. The same key is used by the read path, the write path and, as the
//! `<table>:` prefix, by table-wide scans.

use std::borrow::Borrow;
use std::fmt::{self, Display};

use crate::error::{Error, Result};

const SEPARATOR: char = ':';

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(table: &str, id: &str) -> Self {
        let mut raw = String::with_capacity(table.len() + id.len() + 1);
        raw.push_str(table);
        raw.push(SEPARATOR);
        raw.push_str(id);
        Self(raw)
    }

    /// Wrap a key obtained from the fast cache, e.g. by a prefix scan.
    pub fn from_raw(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        match raw.find(SEPARATOR) {
            Some(pos) if pos > 0 => Ok(Self(raw)),
            _ => Err(Error::InvalidKey(raw)),
        }
    }

    /// The scan prefix covering every key of `table`.
    pub fn table_prefix(table: &str) -> String {
        format!("{table}{SEPARATOR}")
    }

    pub fn table(&self) -> &str {
        self.0.split_once(SEPARATOR).map_or(self.0.as_str(), |(table, _)| table)
    }

    pub fn id(&self) -> &str {
        self.0.split_once(SEPARATOR).map_or("", |(_, id)| id)
    }

    /// Exact table match; `Team` does not own `TeamMember:1`.
    pub fn belongs_to(&self, table: &str) -> bool {
        self.table() == table
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CacheKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&DocRef> for CacheKey {
    fn from(doc_ref: &DocRef) -> Self {
        CacheKey::new(&doc_ref.table, &doc_ref.id)
    }
}

/// A `(table, id)` lookup request.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocRef {
    table: String,
    id:    String,
}

impl DocRef {
    pub fn new(table: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            id:    id.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn key(&self) -> CacheKey {
        CacheKey::from(self)
    }
}

impl From<&CacheKey> for DocRef {
    fn from(key: &CacheKey) -> Self {
        DocRef::new(key.table(), key.id())
    }
}
