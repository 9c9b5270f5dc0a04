//! Cache Store Module
//!
//! Main cache engine combining the key index with the recency list and TTL
//! expiration.
//!
//! # Locking
//! A single mutex guards the index, the list and every entry's fields, so
//! each structural change (and every value read or write) happens in one
//! critical section: a key is never visible in one structure but not the
//! other, and tail eviction can never interleave with a move-to-front of the
//! same entry. The entry count is an atomic updated inside that section and
//! read without locking. Eviction callbacks always run after the lock is
//! released.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::cache::{
    CacheBuilder, CacheEntry, CacheStats, EntryId, KeyIndex, RecencyList, StatsRecorder,
    DEFAULT_CAPACITY,
};
use crate::error::Result;
use crate::tasks::JanitorHandle;

/// Callback invoked with the key and value of every evicted entry.
pub type EvictionCallback<V> = Arc<dyn Fn(&str, V) + Send + Sync>;

// == Locked State ==
#[derive(Debug)]
struct State<V> {
    list: RecencyList<V>,
    index: KeyIndex,
}

// == Cache Core ==
/// State shared between the public handle and the janitor task.
pub(crate) struct CacheCore<V> {
    state: Mutex<State<V>>,
    count: AtomicUsize,
    capacity: usize,
    on_evicted: Option<EvictionCallback<V>>,
    stats: StatsRecorder,
}

impl<V> CacheCore<V> {
    pub(crate) fn new(capacity: usize, on_evicted: Option<EvictionCallback<V>>) -> Self {
        let capacity = if capacity == 0 {
            debug!(
                "Capacity 0 requested, falling back to default of {}",
                DEFAULT_CAPACITY
            );
            DEFAULT_CAPACITY
        } else {
            capacity
        };

        Self {
            state: Mutex::new(State {
                list: RecencyList::with_capacity(capacity),
                index: KeyIndex::with_capacity(capacity),
            }),
            count: AtomicUsize::new(0),
            capacity,
            on_evicted,
            stats: StatsRecorder::default(),
        }
    }

    fn put(&self, key: String, value: V, ttl: Option<Duration>) {
        let evicted = {
            let mut guard = self.state.lock();
            let state = &mut *guard;

            // Overwrite: replace in place and bump to head
            if let Some(id) = state.index.get(&key) {
                let previous = state
                    .list
                    .get_mut(id)
                    .map(|entry| entry.replace(value, ttl));
                state.list.move_to_front(id);
                // The old value is dropped only after the lock is released
                drop(guard);
                drop(previous);
                return;
            }

            let evicted = if self.count.load(Ordering::Acquire) >= self.capacity {
                let tail = state.list.remove_back();
                if let Some(tail) = &tail {
                    state.index.remove(&tail.key);
                }
                tail
            } else {
                None
            };

            let id = state.list.push_front(CacheEntry::new(key.clone(), value, ttl));
            state.index.insert(key, id);
            if evicted.is_none() {
                self.count.fetch_add(1, Ordering::AcqRel);
            }
            evicted
        };

        if let Some(entry) = evicted {
            self.stats.record_eviction();
            trace!("Evicted least recently used key {}", entry.key);
            self.notify_evicted(entry.key, entry.value);
        }
    }

    fn get(&self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        let value = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let hit = state.index.get(key).and_then(|id| {
                let entry = state.list.get(id)?;
                (!entry.is_expired()).then(|| (id, entry.value.clone()))
            });
            hit.map(|(id, value)| {
                state.list.move_to_front(id);
                value
            })
        };

        match &value {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        value
    }

    fn peek(&self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        let state = self.state.lock();
        let entry = state.list.get(state.index.get(key)?)?;
        (!entry.is_expired()).then(|| entry.value.clone())
    }

    fn contains(&self, key: &str) -> bool {
        let state = self.state.lock();
        state
            .index
            .get(key)
            .and_then(|id| state.list.get(id))
            .is_some_and(|entry| !entry.is_expired())
    }

    fn delete(&self, key: &str) -> Option<V> {
        let entry = {
            let mut state = self.state.lock();
            let id = state.index.get(key)?;
            self.unlink(&mut state, id)?
        };
        (!entry.is_expired()).then_some(entry.value)
    }

    // Removes an entry from both structures; the one path shared by
    // delete and the expiry sweep.
    fn unlink(&self, state: &mut State<V>, id: EntryId) -> Option<CacheEntry<V>> {
        let entry = state.list.remove(id)?;
        state.index.remove(&entry.key);
        self.count.fetch_sub(1, Ordering::AcqRel);
        Some(entry)
    }

    /// Removes every entry expired as of now and reports each through the
    /// eviction callback. Returns the number of entries removed.
    pub(crate) fn sweep_expired(&self) -> usize {
        let now = Instant::now();

        // Scan under the lock, delete key by key afterwards
        let candidates: Vec<String> = {
            let state = self.state.lock();
            state
                .list
                .iter()
                .filter(|entry| entry.is_expired_at(now))
                .map(|entry| entry.key.clone())
                .collect()
        };

        let mut removed = 0;
        for key in candidates {
            let entry = {
                let mut state = self.state.lock();
                // A concurrent put may have refreshed the key since the scan
                match state.index.get(&key) {
                    Some(id)
                        if state
                            .list
                            .get(id)
                            .is_some_and(|entry| entry.is_expired_at(now)) =>
                    {
                        self.unlink(&mut state, id)
                    }
                    _ => None,
                }
            };

            if let Some(entry) = entry {
                removed += 1;
                trace!("Expired key {}", entry.key);
                self.notify_evicted(entry.key, entry.value);
            }
        }

        self.stats.record_expirations(removed as u64);
        removed
    }

    fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let state = self.state.lock();
        state
            .list
            .iter()
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.key.clone())
            .collect()
    }

    fn clear(&self) {
        let dropped = {
            let mut state = self.state.lock();
            state.index.clear();
            self.count.store(0, Ordering::Release);
            std::mem::replace(&mut state.list, RecencyList::with_capacity(self.capacity))
        };
        drop(dropped);
    }

    fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    fn notify_evicted(&self, key: String, value: V) {
        if let Some(callback) = &self.on_evicted {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(&key, value)));
            if outcome.is_err() {
                warn!("Eviction callback panicked for key {}", key);
            }
        }
    }

    #[cfg(test)]
    fn assert_consistent(&self) {
        let state = self.state.lock();
        state.list.assert_consistent();
        assert_eq!(state.list.len(), state.index.len(), "index and list sizes differ");
        assert_eq!(state.list.len(), self.count(), "count drifted from list length");
        assert!(self.count() <= self.capacity, "count exceeds capacity");
        for entry in state.list.iter() {
            let id = state.index.get(&entry.key).expect("linked entry missing from index");
            assert_eq!(state.list.get(id).map(|e| e.key.as_str()), Some(entry.key.as_str()));
        }
    }
}

// == LRU Cache ==
/// Bounded, thread-safe LRU cache with optional per-entry TTL.
///
/// All operations take `&self`; share the cache across threads with an `Arc`.
/// When built with auto eviction, a background janitor reclaims expired
/// entries until the cache is dropped or [`LruCache::shutdown`] is awaited.
pub struct LruCache<V> {
    core: Arc<CacheCore<V>>,
    janitor: Option<JanitorHandle>,
}

impl<V: Send + 'static> LruCache<V> {
    // == Constructor ==
    /// Creates a cache holding at most `capacity` entries, without a janitor.
    ///
    /// A capacity of 0 silently falls back to [`DEFAULT_CAPACITY`].
    pub fn new(capacity: usize) -> Self {
        Self {
            core: Arc::new(CacheCore::new(capacity, None)),
            janitor: None,
        }
    }

    /// Starts building a cache with eviction callback and janitor options.
    pub fn builder(capacity: usize) -> CacheBuilder<V> {
        CacheBuilder::new(capacity)
    }

    pub(crate) fn from_parts(core: Arc<CacheCore<V>>, janitor: Option<JanitorHandle>) -> Self {
        Self { core, janitor }
    }
}

impl<V> LruCache<V> {
    // == Put ==
    /// Stores a value, optionally expiring after `ttl`.
    ///
    /// If the key exists, its value and expiry are replaced in place and the
    /// entry becomes the most recently used. If the key is new and the cache
    /// is full, the least recently used entry is evicted first and reported to
    /// the eviction callback. A `ttl` of `None` or zero never expires.
    pub fn put(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        self.core.put(key.into(), value, ttl);
    }

    // == Get ==
    /// Returns a clone of the value, or None if absent or expired.
    ///
    /// A hit moves the entry to the head of the recency order: this "read"
    /// mutates shared state and takes the cache lock exclusively.
    pub fn get(&self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        self.core.get(key)
    }

    /// Returns a clone of the value without touching recency order or stats.
    pub fn peek(&self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        self.core.peek(key)
    }

    /// Checks whether a live (unexpired) entry exists, without touching recency.
    pub fn contains(&self, key: &str) -> bool {
        self.core.contains(key)
    }

    // == Delete ==
    /// Removes an entry and returns its value.
    ///
    /// Returns None if the key is absent or already expired; an expired entry
    /// is still physically removed. Never invokes the eviction callback.
    pub fn delete(&self, key: &str) -> Option<V> {
        self.core.delete(key)
    }

    // == Count ==
    /// Returns the number of stored entries, including expired ones the
    /// janitor has not reclaimed yet.
    pub fn count(&self) -> usize {
        self.core.count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn capacity(&self) -> usize {
        self.core.capacity
    }

    /// Returns live keys ordered from most to least recently used.
    pub fn keys(&self) -> Vec<String> {
        self.core.keys()
    }

    /// Removes every entry without invoking the eviction callback.
    pub fn clear(&self) {
        self.core.clear();
    }

    /// Synchronously reclaims expired entries, exactly as one janitor cycle
    /// does. Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        self.core.sweep_expired()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.core.stats.snapshot(self.count(), self.core.capacity)
    }

    /// Returns true while a background janitor is attached and running.
    pub fn has_janitor(&self) -> bool {
        self.janitor
            .as_ref()
            .is_some_and(|janitor| !janitor.is_finished())
    }

    // == Shutdown ==
    /// Stops the background janitor and waits for it to exit.
    ///
    /// No-op when the cache was built without auto eviction. Dropping the
    /// cache also stops the janitor, without waiting.
    pub async fn shutdown(&mut self) -> Result<()> {
        match self.janitor.take() {
            Some(janitor) => janitor.stop().await,
            None => Ok(()),
        }
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        self.core.assert_consistent();
    }
}

impl<V> fmt::Debug for LruCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("capacity", &self.core.capacity)
            .field("count", &self.count())
            .field("janitor", &self.janitor.is_some())
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex as StdMutex, OnceLock, Weak};
    use std::thread::sleep;

    type Evictions = Arc<StdMutex<Vec<(String, String)>>>;

    fn recording_cache(capacity: usize) -> (LruCache<String>, Evictions) {
        let evicted = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&evicted);
        let cache = LruCache::builder(capacity)
            .on_evicted(move |key: &str, value: String| {
                sink.lock().unwrap().push((key.to_string(), value));
            })
            .build()
            .unwrap();
        (cache, evicted)
    }

    #[test]
    fn test_store_new() {
        let cache: LruCache<String> = LruCache::new(100);
        assert_eq!(cache.count(), 0);
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 100);
        assert!(!cache.has_janitor());
    }

    #[test]
    fn test_zero_capacity_uses_default() {
        let cache: LruCache<String> = LruCache::new(0);
        assert_eq!(cache.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn test_store_put_and_get() {
        let cache = LruCache::new(100);

        cache.put("key1", "value1".to_string(), None);

        assert_eq!(cache.get("key1"), Some("value1".to_string()));
        assert_eq!(cache.count(), 1);
        cache.core.assert_consistent();
    }

    #[test]
    fn test_store_get_nonexistent() {
        let cache: LruCache<String> = LruCache::new(100);

        assert_eq!(cache.get("nonexistent"), None);
        assert_eq!(cache.get("nonexistent"), None);
        assert_eq!(cache.delete("nonexistent"), None);
        assert_eq!(cache.count(), 0);
        cache.core.assert_consistent();
    }

    #[test]
    fn test_store_delete() {
        let cache = LruCache::new(100);

        cache.put("key1", "value1".to_string(), None);
        assert_eq!(cache.delete("key1"), Some("value1".to_string()));

        assert!(cache.is_empty());
        assert_eq!(cache.get("key1"), None);
        cache.core.assert_consistent();
    }

    #[test]
    fn test_delete_positions() {
        // Tail, middle and head of a three element list
        for victim in ["1", "2", "3"] {
            let cache = LruCache::new(3);
            cache.put("1", 1, None);
            cache.put("2", 2, None);
            cache.put("3", 3, None);

            assert!(cache.delete(victim).is_some());
            assert_eq!(cache.count(), 2);
            cache.core.assert_consistent();
        }
    }

    #[test]
    fn test_store_overwrite() {
        let cache = LruCache::new(3);

        cache.put("1", "1".to_string(), None);
        cache.put("1", "foobar".to_string(), None);

        assert_eq!(cache.get("1"), Some("foobar".to_string()));
        assert_eq!(cache.count(), 1);
        cache.core.assert_consistent();
    }

    #[test]
    fn test_overwrite_bumps_recency() {
        let cache = LruCache::new(3);
        cache.put("a", 1, None);
        cache.put("b", 2, None);
        cache.put("c", 3, None);

        cache.put("a", 10, None);
        assert_eq!(cache.keys(), vec!["a", "c", "b"]);

        cache.put("d", 4, None);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(10));
    }

    #[test]
    fn test_store_lru_eviction() {
        let (cache, evicted) = recording_cache(3);

        cache.put("1", "1".to_string(), None);
        cache.put("2", "2".to_string(), None);
        cache.put("3", "3".to_string(), None);

        // Bumps "1" to the head: 1, 3, 2
        assert_eq!(cache.get("1"), Some("1".to_string()));

        cache.put("4", "4".to_string(), None);

        assert_eq!(cache.count(), 3);
        assert_eq!(cache.get("2"), None);
        assert_eq!(cache.get("4"), Some("4".to_string()));
        assert_eq!(
            *evicted.lock().unwrap(),
            vec![("2".to_string(), "2".to_string())]
        );
        assert_eq!(cache.stats().evictions, 1);
        cache.core.assert_consistent();
    }

    #[test]
    fn test_capacity_one() {
        let cache = LruCache::new(1);
        cache.put("1", "1", None);
        cache.put("2", "2", None);

        assert_eq!(cache.get("2"), Some("2"));
        assert_eq!(cache.get("1"), None);
        assert_eq!(cache.count(), 1);
        cache.core.assert_consistent();
    }

    #[test]
    fn test_delete_does_not_fire_callback() {
        let (cache, evicted) = recording_cache(2);
        cache.put("a", "a".to_string(), None);
        cache.put("b", "b".to_string(), None);

        // "a" is the tail
        assert_eq!(cache.delete("a"), Some("a".to_string()));
        cache.clear();

        assert!(evicted.lock().unwrap().is_empty());
        assert!(cache.is_empty());
        cache.core.assert_consistent();
    }

    #[test]
    fn test_expired_entry_reads_as_miss() {
        let cache = LruCache::new(10);

        cache.put("short", "v".to_string(), Some(Duration::from_millis(50)));
        assert_eq!(cache.get("short"), Some("v".to_string()));

        sleep(Duration::from_millis(80));

        assert_eq!(cache.get("short"), None);
        assert!(!cache.contains("short"));
        assert_eq!(cache.peek("short"), None);
        // Still physically present until swept
        assert_eq!(cache.count(), 1);
        assert!(cache.keys().is_empty());
    }

    #[test]
    fn test_delete_expired_returns_none() {
        let cache = LruCache::new(10);
        cache.put("short", 1, Some(Duration::from_millis(20)));
        sleep(Duration::from_millis(40));

        assert_eq!(cache.delete("short"), None);
        assert_eq!(cache.count(), 0);
        cache.core.assert_consistent();
    }

    #[test]
    fn test_overwrite_refreshes_ttl() {
        let cache = LruCache::new(10);
        cache.put("k", 1, Some(Duration::from_millis(30)));
        cache.put("k", 2, None);

        sleep(Duration::from_millis(50));

        assert_eq!(cache.get("k"), Some(2));
    }

    #[test]
    fn test_purge_expired_fires_callback() {
        let (cache, evicted) = recording_cache(10);

        cache.put("short", "gone".to_string(), Some(Duration::from_millis(30)));
        cache.put("long", "kept".to_string(), Some(Duration::from_secs(60)));
        cache.put("forever", "kept".to_string(), None);

        sleep(Duration::from_millis(60));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.count(), 2);
        assert_eq!(
            *evicted.lock().unwrap(),
            vec![("short".to_string(), "gone".to_string())]
        );
        assert_eq!(cache.stats().expirations, 1);
        assert_eq!(cache.purge_expired(), 0);
        cache.core.assert_consistent();
    }

    #[test]
    fn test_peek_does_not_bump() {
        let cache = LruCache::new(2);
        cache.put("a", 1, None);
        cache.put("b", 2, None);

        assert_eq!(cache.peek("a"), Some(1));
        assert!(cache.contains("a"));
        cache.put("c", 3, None);

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_panicking_callback_keeps_state() {
        let cache = LruCache::builder(1)
            .on_evicted(|_key: &str, _value: u32| panic!("callback failure"))
            .build()
            .unwrap();

        cache.put("a", 1, None);
        cache.put("b", 2, None);

        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.count(), 1);
        cache.core.assert_consistent();
    }

    #[test]
    fn test_store_stats() {
        let cache = LruCache::new(100);

        cache.put("key1", "value1", None);
        cache.get("key1"); // hit
        cache.get("nonexistent"); // miss

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.capacity, 100);
    }

    #[test]
    fn test_sweep_skips_key_refreshed_after_scan() {
        let handle: Arc<OnceLock<Weak<LruCache<u32>>>> = Arc::new(OnceLock::new());
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let (slot, sink) = (Arc::clone(&handle), Arc::clone(&seen));
        let cache = Arc::new(
            LruCache::builder(10)
                .on_evicted(move |key: &str, _value: u32| {
                    sink.lock().unwrap().push(key.to_string());
                    if key == "a" {
                        if let Some(cache) = slot.get().and_then(Weak::upgrade) {
                            cache.put("b", 99, None);
                        }
                    }
                })
                .build()
                .unwrap(),
        );
        handle.set(Arc::downgrade(&cache)).unwrap();

        // Scan order is head to tail: a, then b
        cache.put("b", 1, Some(Duration::from_millis(10)));
        cache.put("a", 2, Some(Duration::from_millis(10)));
        sleep(Duration::from_millis(30));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.get("b"), Some(99));
        assert_eq!(*seen.lock().unwrap(), vec!["a".to_string()]);
        cache.assert_consistent();
    }

    // Value whose destructor reads the cache it lives in
    struct Reentrant {
        cache: Option<Weak<LruCache<Reentrant>>>,
    }

    impl Drop for Reentrant {
        fn drop(&mut self) {
            if let Some(cache) = self.cache.as_ref().and_then(Weak::upgrade) {
                cache.contains("other");
            }
        }
    }

    #[test]
    fn test_replaced_and_cleared_values_drop_outside_lock() {
        let cache = Arc::new(LruCache::new(4));
        let weak = Arc::downgrade(&cache);

        cache.put("k", Reentrant { cache: Some(weak.clone()) }, None);
        cache.put("k", Reentrant { cache: Some(weak.clone()) }, None);
        assert_eq!(cache.count(), 1);

        cache.put("j", Reentrant { cache: Some(weak) }, None);
        cache.clear();

        assert!(cache.is_empty());
        cache.assert_consistent();
    }

    #[test]
    fn test_keys_order() {
        let cache = LruCache::new(5);
        cache.put("a", (), None);
        cache.put("b", (), None);
        cache.put("c", (), None);
        cache.get("a");

        assert_eq!(cache.keys(), vec!["a", "c", "b"]);
    }
}
