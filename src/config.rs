use garde::Validate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::coordinator::{DEFAULT_SCAN_PAGE_SIZE, DEFAULT_TTL};
use crate::error::{Error, Result};
use crate::types::Population;

/// Coordinator settings in a form that can be loaded from a configuration file.
///
/// ```
/// # use rwt_cache::config::CacheConfig;
/// let config: CacheConfig = serde_json::from_str(r#"{"ttl_ms": 60000, "read_population": "synchronous"}"#).unwrap();
/// let config = config.checked().unwrap();
/// assert_eq!(config.scan_page_size, 100);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Entry lifetime in milliseconds.
    #[garde(range(min = 1))]
    pub ttl_ms:          u64,
    #[garde(range(min = 1))]
    pub scan_page_size:  usize,
    #[garde(skip)]
    pub read_population: Population,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms:          DEFAULT_TTL.as_millis() as u64,
            scan_page_size:  DEFAULT_SCAN_PAGE_SIZE,
            read_population: Population::default(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Validate and return self.
    pub fn checked(self) -> Result<Self> {
        self.validate().map_err(|report| Error::Config(report.to_string()))?;
        Ok(self)
    }
}
