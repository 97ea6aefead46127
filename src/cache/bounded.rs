//! Insertion-ordered table with a fixed capacity.

use std::collections::{HashMap, VecDeque};

use crate::source::Record;
use crate::spectrum::DecodedSpectrum;

/// Values that may hold resources to hand back when they leave a cache.
pub trait Releasable {
    /// Called exactly once when the value is evicted, replaced or cleared.
    fn on_evict(&mut self) {}
}

impl Releasable for DecodedSpectrum {}

impl Releasable for Record {
    fn on_evict(&mut self) {
        self.release_logged();
    }
}

/// FIFO-evicting table keyed by record index.
///
/// Reading or replacing an entry does not move it in the eviction order.
/// Every value is passed to [`Releasable::on_evict`] once when it leaves the
/// table, including when the table is cleared or dropped.
#[derive(Debug)]
pub struct BoundedCache<V: Releasable> {
    entries: HashMap<usize, V>,
    order: VecDeque<usize>,
    capacity: usize,
    evictions: u64,
}

impl<V: Releasable> BoundedCache<V> {
    /// Empty table; a zero capacity is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
            evictions: 0,
        }
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `index` is cached.
    pub fn contains(&self, index: usize) -> bool {
        self.entries.contains_key(&index)
    }

    /// Cached value for `index`.
    pub fn get(&self, index: usize) -> Option<&V> {
        self.entries.get(&index)
    }

    /// Cached indices, oldest first.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.order.iter().copied()
    }

    /// Entries evicted for capacity so far.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Insert or replace the value for `index`.
    ///
    /// A replaced value is released in place and keeps its queue position.
    /// Returns the index evicted to make room, if any.
    pub fn insert(&mut self, index: usize, value: V) -> Option<usize> {
        if let Some(slot) = self.entries.get_mut(&index) {
            let mut previous = std::mem::replace(slot, value);
            previous.on_evict();
            return None;
        }

        self.entries.insert(index, value);
        self.order.push_back(index);

        let mut evicted = None;
        while self.order.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(mut value) = self.entries.remove(&oldest) {
                value.on_evict();
            }
            self.evictions += 1;
            evicted = Some(oldest);
        }
        evicted
    }

    /// Release and remove every entry.
    pub fn clear(&mut self) {
        while let Some(index) = self.order.pop_front() {
            if let Some(mut value) = self.entries.remove(&index) {
                value.on_evict();
            }
        }
    }
}

impl<V: Releasable> Drop for BoundedCache<V> {
    fn drop(&mut self) {
        self.clear();
    }
}
