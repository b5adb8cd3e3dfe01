//! Documents and shallow patches.
//!
//! A [`Document`] is an opaque JSON object with an `id` field. The cache never looks inside it except for the id and
//! when a [`Patch`] is applied by a table-wide update.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::key::CacheKey;

pub const ID_FIELD: &str = "id";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// The document id. Numeric ids are rendered in decimal.
    pub fn id(&self) -> Option<String> {
        match self.0.get(ID_FIELD)? {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    /// Key of this document within `table`.
    pub fn key_in(&self, table: &str) -> Result<CacheKey> {
        let id = self.id().ok_or_else(|| Error::MissingId {
            table: table.to_string(),
        })?;
        Ok(CacheKey::new(table, &id))
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Shallow assignment of every patch field, `id` excepted.
    pub fn apply(&mut self, patch: &Patch) {
        for (field, value) in patch.0.iter().filter(|(field, _)| *field != ID_FIELD) {
            self.0.insert(field.clone(), value.clone());
        }
    }

    pub fn encode(&self, key: &CacheKey) -> Result<String> {
        serde_json::to_string(self).map_err(|source| Error::Encode {
            key: key.clone(),
            source,
        })
    }

    pub fn decode(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

impl From<Map<String, Value>> for Document {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl TryFrom<Value> for Document {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(Error::InvalidDocument(format!("expected a JSON object, got {other}"))),
        }
    }
}

/// Shallow field update applied to every document of a table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch(Map<String, Value>);

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Value> for Patch {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(Error::InvalidDocument(format!("patch must be a JSON object, got {other}"))),
        }
    }
}
