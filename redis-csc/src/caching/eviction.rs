use std::collections::VecDeque;
use std::num::NonZeroUsize;

use lru::LruCache;

use super::CacheKey;

/// Decides which entries leave the cache when it is full.
///
/// A policy only does bookkeeping: it tracks accesses and picks victims, it
/// never touches the cache's store itself.  The cache drains the pending
/// victims right after every [`touch`](EvictionPolicy::touch) and removes
/// them from its store and reverse index.
///
/// Implementations are not synchronized.  The cache drives the policy only
/// while holding its exclusive lock; using a policy outside that lock is a
/// bug.
pub trait EvictionPolicy: Send {
    /// Records an access (or insertion) of `key` for recency tracking.
    /// When the tracked set grows past the policy's capacity, the chosen
    /// victim is queued for [`evict_next`](EvictionPolicy::evict_next).
    /// O(1).
    fn touch(&mut self, key: &CacheKey);

    /// Pops the next pending victim queued by a prior `touch`.  Returns
    /// `None` when no eviction is pending.  O(1).
    fn evict_next(&mut self) -> Option<CacheKey>;

    /// Pops up to `count` pending victims.
    fn evict_many(&mut self, count: usize) -> Vec<CacheKey> {
        let mut victims = Vec::new();
        for _ in 0..count {
            match self.evict_next() {
                Some(key) => victims.push(key),
                None => break,
            }
        }
        victims
    }

    /// Drops all bookkeeping for `key`.  Returns whether the key was
    /// tracked.
    fn reset(&mut self, key: &CacheKey) -> bool;

    /// Drops all bookkeeping, returning the number of tracked entries that
    /// were cleared.
    fn reset_all(&mut self) -> usize;

    /// The maximum number of keys this policy tracks.
    fn max_size(&self) -> usize;

    /// A short name identifying the policy, for diagnostics.
    fn policy_name(&self) -> &'static str;
}

/// Least-recently-used eviction.
///
/// Recency order lives in an [`lru::LruCache`] keyed by [`CacheKey`]; keys
/// pushed out of it are parked in a FIFO queue until the cache drains them.
pub struct LruEvictionPolicy {
    tracked: LruCache<CacheKey, ()>,
    pending: VecDeque<CacheKey>,
}

impl LruEvictionPolicy {
    /// Creates an LRU policy bounded to `max_size` keys.
    pub fn new(max_size: NonZeroUsize) -> LruEvictionPolicy {
        LruEvictionPolicy {
            tracked: LruCache::new(max_size),
            pending: VecDeque::new(),
        }
    }
}

impl EvictionPolicy for LruEvictionPolicy {
    fn touch(&mut self, key: &CacheKey) {
        if let Some((victim, ())) = self.tracked.push(key.clone(), ()) {
            // push returns the displaced entry; when the key was already
            // tracked that is the key itself and nothing was evicted.
            if victim != *key {
                self.pending.push_back(victim);
            }
        }
    }

    fn evict_next(&mut self) -> Option<CacheKey> {
        self.pending.pop_front()
    }

    fn reset(&mut self, key: &CacheKey) -> bool {
        let tracked = self.tracked.pop(key).is_some();
        self.pending.retain(|pending| pending != key);
        tracked
    }

    fn reset_all(&mut self) -> usize {
        let cleared = self.tracked.len();
        self.tracked.clear();
        self.pending.clear();
        cleared
    }

    fn max_size(&self) -> usize {
        self.tracked.cap().get()
    }

    fn policy_name(&self) -> &'static str {
        "LRU"
    }
}
