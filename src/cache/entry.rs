//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

use crate::cache::list::EntryId;

// == Cache Entry ==
/// A single cache record: key, value, optional expiry and its list links.
///
/// Links are only meaningful while the entry is owned by a
/// [`RecencyList`](crate::cache::RecencyList); they are cleared on removal.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The key this entry is indexed under
    pub key: String,
    /// The stored value
    pub value: V,
    /// Absolute expiry instant, None = never expires
    pub expire_at: Option<Instant>,
    pub(crate) prev: Option<EntryId>,
    pub(crate) next: Option<EntryId>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new unlinked cache entry with optional TTL.
    ///
    /// A zero TTL is treated the same as no TTL.
    pub fn new(key: String, value: V, ttl: Option<Duration>) -> Self {
        Self {
            key,
            value,
            expire_at: expiry_from_ttl(ttl),
            prev: None,
            next: None,
        }
    }

    // == Replace ==
    /// Replaces value and expiry in place, keeping key and list position.
    pub fn replace(&mut self, value: V, ttl: Option<Duration>) -> V {
        self.expire_at = expiry_from_ttl(ttl);
        std::mem::replace(&mut self.value, value)
    }

    // == Is Expired ==
    /// Checks if the entry has expired as of `now`.
    ///
    /// Boundary condition: an entry is expired once `now` reaches the
    /// expiration instant.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expire_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    /// Checks if the entry has expired as of the current instant.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }
}

fn expiry_from_ttl(ttl: Option<Duration>) -> Option<Instant> {
    ttl.filter(|ttl| !ttl.is_zero())
        .and_then(|ttl| Instant::now().checked_add(ttl))
}
