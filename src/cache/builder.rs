//! Cache Builder Module
//!
//! Collects construction options and wires the optional janitor.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::debug;

use crate::cache::store::{CacheCore, EvictionCallback};
use crate::cache::{LruCache, DEFAULT_SWEEP_INTERVAL};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::spawn_janitor;

// == Cache Builder ==
/// Builder for [`LruCache`].
///
/// # Example
/// ```no_run
/// # async fn demo() -> lru_ttl_cache::error::Result<()> {
/// use std::time::Duration;
/// use lru_ttl_cache::LruCache;
///
/// let mut cache = LruCache::builder(1000)
///     .on_evicted(|key: &str, _value: String| println!("evicted {}", key))
///     .auto_eviction(true)
///     .sweep_interval(Duration::from_secs(1))
///     .build()?;
///
/// cache.put("session", "token".to_string(), Some(Duration::from_secs(30)));
/// cache.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct CacheBuilder<V> {
    capacity: usize,
    on_evicted: Option<EvictionCallback<V>>,
    auto_eviction: bool,
    sweep_interval: Duration,
    runtime: Option<Handle>,
}

impl<V: Send + 'static> CacheBuilder<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            on_evicted: None,
            auto_eviction: false,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            runtime: None,
        }
    }

    /// Seeds capacity, auto eviction and sweep interval from a config.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity)
            .auto_eviction(config.auto_eviction)
            .sweep_interval(config.sweep_interval)
    }

    /// Registers a callback for capacity and TTL evictions.
    ///
    /// Never called for explicit deletes or `clear`. Runs outside the cache
    /// lock; a panic inside it is caught and logged.
    pub fn on_evicted<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, V) + Send + Sync + 'static,
    {
        self.on_evicted = Some(Arc::new(callback));
        self
    }

    /// Enables the background janitor that reclaims expired entries.
    pub fn auto_eviction(mut self, enable: bool) -> Self {
        self.auto_eviction = enable;
        self
    }

    /// Sets the janitor period. Zero falls back to the default of 2 seconds.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = if interval.is_zero() {
            DEFAULT_SWEEP_INTERVAL
        } else {
            interval
        };
        self
    }

    /// Runtime hosting the janitor; defaults to the ambient tokio runtime.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    // == Build ==
    /// Creates the cache and, if enabled, spawns its janitor.
    ///
    /// Fails with [`CacheError::RuntimeUnavailable`] only when auto eviction is
    /// enabled, no runtime handle was given and none is currently entered.
    pub fn build(self) -> Result<LruCache<V>> {
        let core = Arc::new(CacheCore::new(self.capacity, self.on_evicted));

        let janitor = if self.auto_eviction {
            let runtime = match self.runtime {
                Some(handle) => handle,
                None => Handle::try_current().map_err(|_| CacheError::RuntimeUnavailable)?,
            };
            Some(spawn_janitor(Arc::downgrade(&core), self.sweep_interval, &runtime))
        } else {
            None
        };

        debug!(
            "Cache built: auto_eviction={}, sweep_interval={:?}",
            self.auto_eviction, self.sweep_interval
        );
        Ok(LruCache::from_parts(core, janitor))
    }
}
