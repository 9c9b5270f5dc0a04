//! Recency List Module
//!
//! Doubly-linked list ordering entries from most to least recently used.
//!
//! Entries live in an arena of slots addressed by [`EntryId`]; `prev`/`next`
//! links are slot indices, so no node is ever shared or aliased. Freed slots
//! are recycled through a free list.

use crate::cache::CacheEntry;

// == Entry Handle ==
/// Opaque position of an entry inside a [`RecencyList`].
///
/// A handle stays valid until its entry is removed. After removal the slot
/// may be reused, so callers must drop handles together with the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(usize);

// == Recency List ==
/// Tracks access order for LRU eviction.
///
/// - Head = Most recently used
/// - Tail = Least recently used
#[derive(Debug)]
pub struct RecencyList<V> {
    slots: Vec<Option<CacheEntry<V>>>,
    free: Vec<usize>,
    head: Option<EntryId>,
    tail: Option<EntryId>,
    len: usize,
}

impl<V> Default for RecencyList<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> RecencyList<V> {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Creates an empty list with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            ..Self::new()
        }
    }

    // == Push Front ==
    /// Links `entry` as the new head and returns its handle.
    pub fn push_front(&mut self, entry: CacheEntry<V>) -> EntryId {
        let id = match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(entry);
                EntryId(index)
            }
            None => {
                self.slots.push(Some(entry));
                EntryId(self.slots.len() - 1)
            }
        };
        self.link_front(id);
        id
    }

    // == Move To Front ==
    /// Marks an entry as most recently used.
    ///
    /// No-op if the entry is already the head or the handle is stale.
    pub fn move_to_front(&mut self, id: EntryId) {
        if self.head == Some(id) || self.get(id).is_none() {
            return;
        }
        self.unlink(id);
        self.link_front(id);
    }

    // == Remove ==
    /// Unlinks an entry from wherever it sits and returns it.
    ///
    /// The returned entry has both links cleared. Returns None for a stale handle.
    pub fn remove(&mut self, id: EntryId) -> Option<CacheEntry<V>> {
        self.get(id)?;
        self.unlink(id);
        let entry = self.slots[id.0].take();
        self.free.push(id.0);
        entry
    }

    // == Remove Back ==
    /// Removes and returns the least recently used entry.
    ///
    /// Returns None if the list is empty.
    pub fn remove_back(&mut self) -> Option<CacheEntry<V>> {
        let tail = self.tail?;
        self.remove(tail)
    }

    // == Accessors ==
    /// Returns the entry behind a handle.
    pub fn get(&self, id: EntryId) -> Option<&CacheEntry<V>> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    /// Returns the entry behind a handle for in-place mutation.
    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut CacheEntry<V>> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Returns the most recently used entry.
    pub fn front(&self) -> Option<&CacheEntry<V>> {
        self.head.and_then(|id| self.get(id))
    }

    /// Returns the least recently used entry.
    pub fn back(&self) -> Option<&CacheEntry<V>> {
        self.tail.and_then(|id| self.get(id))
    }

    /// Returns the number of linked entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates entries from most to least recently used.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    /// Drops every entry and resets the list.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    // Caller guarantees `id` refers to an occupied, unlinked slot.
    fn link_front(&mut self, id: EntryId) {
        let old_head = self.head;
        if let Some(entry) = self.get_mut(id) {
            entry.prev = None;
            entry.next = old_head;
        }
        match old_head {
            Some(head) => {
                if let Some(head) = self.get_mut(head) {
                    head.prev = Some(id);
                }
            }
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        self.len += 1;
    }

    // Caller guarantees `id` refers to an occupied, linked slot.
    fn unlink(&mut self, id: EntryId) {
        let (prev, next) = match self.get_mut(id) {
            Some(entry) => (entry.prev.take(), entry.next.take()),
            None => return,
        };

        match prev {
            Some(p) => {
                if let Some(prev_entry) = self.get_mut(p) {
                    prev_entry.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(next_entry) = self.get_mut(n) {
                    next_entry.prev = prev;
                }
            }
            None => self.tail = prev,
        }
        self.len -= 1;
    }

    /// Walks the list both ways and panics if links, ends or length disagree.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let mut forward = Vec::new();
        let mut cursor = self.head;
        let mut prev = None;
        while let Some(id) = cursor {
            let entry = self.get(id).expect("linked handle points at empty slot");
            assert_eq!(entry.prev, prev, "broken prev link at {:?}", id);
            forward.push(id);
            prev = Some(id);
            cursor = entry.next;
        }
        assert_eq!(self.tail, prev, "tail does not match last node");
        assert_eq!(forward.len(), self.len, "length does not match linked nodes");

        let occupied = self.slots.iter().filter(|slot| slot.is_some()).count();
        assert_eq!(occupied, self.len, "orphaned slots in arena");
        if self.len == 0 {
            assert!(self.head.is_none() && self.tail.is_none());
        }
    }
}

// == Iterator ==
/// Iterator over list entries, head to tail.
pub struct Iter<'a, V> {
    list: &'a RecencyList<V>,
    cursor: Option<EntryId>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a CacheEntry<V>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.list.get(self.cursor?)?;
        self.cursor = entry.next;
        Some(entry)
    }
}
