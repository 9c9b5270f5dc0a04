//! LRU TTL Cache - A concurrency-safe in-process cache
//!
//! Provides a bounded key/value cache with LRU eviction, optional per-entry
//! TTL expiration and an optional background janitor that reclaims expired
//! entries.

pub mod cache;
pub mod config;
pub mod error;
mod tasks;

pub use cache::{CacheBuilder, CacheStats, LruCache, DEFAULT_CAPACITY, DEFAULT_SWEEP_INTERVAL};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
