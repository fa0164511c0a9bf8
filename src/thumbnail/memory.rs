//! In-memory thumbnail tier
//!
//! Minimal LRU cache bounded by the total pixel bytes it holds rather than
//! by entry count, since thumbnail sizes vary widely.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use super::{Thumbnail, ThumbnailKey};

#[derive(Debug)]
pub(crate) struct MemoryTier {
    budget_bytes: usize,
    used_bytes: usize,
    map: HashMap<ThumbnailKey, Arc<Thumbnail>>,
    // front = most-recent, back = least-recent
    lru: VecDeque<ThumbnailKey>,
}

impl MemoryTier {
    pub(crate) fn new(budget_bytes: usize) -> Self {
        Self {
            budget_bytes,
            used_bytes: 0,
            map: HashMap::new(),
            lru: VecDeque::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    pub(crate) fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    #[cfg(test)]
    pub(crate) fn budget_bytes(&self) -> usize {
        self.budget_bytes
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, key: &ThumbnailKey) -> bool {
        self.map.contains_key(key)
    }

    pub(crate) fn clear(&mut self) {
        self.map.clear();
        self.lru.clear();
        self.used_bytes = 0;
    }

    /// Get and bump LRU
    pub(crate) fn get(&mut self, key: &ThumbnailKey) -> Option<Arc<Thumbnail>> {
        let thumbnail = self.map.get(key).cloned()?;
        self.touch(key);
        Some(thumbnail)
    }

    /// Insert or replace, evicting least-recently-used entries until the
    /// budget holds. An entry larger than the whole budget is not kept.
    pub(crate) fn insert(&mut self, key: ThumbnailKey, thumbnail: Arc<Thumbnail>) {
        let size = thumbnail_bytes(&thumbnail);
        if size > self.budget_bytes {
            return;
        }

        if let Some(previous) = self.map.remove(&key) {
            self.used_bytes -= thumbnail_bytes(&previous);
            if let Some(pos) = self.lru.iter().position(|k| *k == key) {
                self.lru.remove(pos);
            }
        }

        while self.used_bytes + size > self.budget_bytes {
            let Some(oldest) = self.lru.pop_back() else {
                break;
            };
            if let Some(evicted) = self.map.remove(&oldest) {
                self.used_bytes -= thumbnail_bytes(&evicted);
            }
        }

        self.used_bytes += size;
        self.map.insert(key, thumbnail);
        self.lru.push_front(key);
    }

    fn touch(&mut self, key: &ThumbnailKey) {
        if let Some(pos) = self.lru.iter().position(|k| k == key) {
            self.lru.remove(pos);
        }
        self.lru.push_front(*key);
    }
}

fn thumbnail_bytes(thumbnail: &Thumbnail) -> usize {
    thumbnail.as_raw().len()
}
