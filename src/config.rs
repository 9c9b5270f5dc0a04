//! Configuration Module
//!
//! Handles cache configuration defaults and loading from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{DEFAULT_CAPACITY, DEFAULT_SWEEP_INTERVAL};
use crate::error::{CacheError, Result};

/// Cache configuration parameters.
///
/// Unset environment variables fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold
    pub capacity: usize,
    /// Whether the background janitor sweeps expired entries
    pub auto_eviction: bool,
    /// Period between janitor sweeps
    #[serde(with = "duration_ms")]
    pub sweep_interval: Duration,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `LRU_CAPACITY` - Maximum cache entries (default: 24)
    /// - `LRU_AUTO_EVICTION` - Enable the janitor, `true`/`false` (default: false)
    /// - `LRU_SWEEP_INTERVAL_MS` - Janitor period in milliseconds (default: 2000)
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            capacity: read_var("LRU_CAPACITY")?.unwrap_or(defaults.capacity),
            auto_eviction: read_var("LRU_AUTO_EVICTION")?.unwrap_or(defaults.auto_eviction),
            sweep_interval: read_var::<u64>("LRU_SWEEP_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.sweep_interval),
        })
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            auto_eviction: false,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

fn read_var<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CacheError::InvalidConfig(format!("{}={}", name, raw))),
        Err(_) => Ok(None),
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::ser::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(d.as_millis())
            .map_err(|_| S::Error::custom("duration in milliseconds overflows u64"))?;
        s.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
