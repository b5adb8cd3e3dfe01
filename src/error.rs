//! Error type shared by the coordinator and the collaborator adapters.

use crate::key::CacheKey;
use thiserror::Error;

/// Boxed error of a collaborator's transport layer.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A round trip to the backing store failed.
    #[error("backing store failure: {0}")]
    Store(#[source] BoxError),

    /// A round trip to the fast cache failed.
    #[error("fast cache failure: {0}")]
    Cache(#[source] BoxError),

    #[error("cannot encode document for '{key}': {source}")]
    Encode {
        key:    CacheKey,
        #[source]
        source: serde_json::Error,
    },

    #[error("document of table '{table}' has no usable id")]
    MissingId { table: String },

    #[error("invalid cache key '{0}': expected '<table>:<id>'")]
    InvalidKey(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// A table-wide update failed part way. `pages` counts the pages that were fully rewritten before the failure.
    #[error("update of table '{table}' aborted after {pages} page(s): {source}")]
    ScanAborted {
        table:  String,
        pages:  usize,
        #[source]
        source: Box<Error>,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn store(err: impl Into<BoxError>) -> Self {
        Self::Store(err.into())
    }

    pub fn cache(err: impl Into<BoxError>) -> Self {
        Self::Cache(err.into())
    }

    /// True for failures of either collaborator's round trip, including those that aborted a table scan.
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Store(_) | Self::Cache(_) => true,
            Self::ScanAborted { source, .. } => source.is_transport(),
            _ => false,
        }
    }
}
