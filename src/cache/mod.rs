//! Cache Module
//!
//! Provides the in-memory LRU cache engine with TTL expiration.

mod builder;
mod entry;
mod index;
mod list;
mod stats;
mod store;


use std::time::Duration;

// Re-export public types
pub use builder::CacheBuilder;
pub use entry::CacheEntry;
pub use index::KeyIndex;
pub use list::{EntryId, Iter, RecencyList};
pub use stats::CacheStats;
pub use store::{EvictionCallback, LruCache};

pub(crate) use stats::StatsRecorder;
pub(crate) use store::CacheCore;

// == Public Constants ==
/// Capacity used when a cache is requested with capacity 0
pub const DEFAULT_CAPACITY: usize = 24;

/// Default period between janitor sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(2);
