use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters describing what a cache has been doing.
///
/// All counters are monotonic and updated with relaxed atomics; the handle
/// is shared between the cache, the connection wrapper and whoever polls
/// the numbers.  Resetting happens by swapping in a fresh `CacheStats`
/// through [`Cache::get_and_reset_stats`](super::Cache::get_and_reset_stats),
/// never by winding counters back.
#[derive(Default)]
pub struct CacheStats {
    hits: AtomicUsize,
    misses: AtomicUsize,
    loads: AtomicUsize,
    evicts: AtomicUsize,
    non_cacheable: AtomicUsize,
    flushes: AtomicUsize,
    invalidations_by_server: AtomicUsize,
    invalidation_messages: AtomicUsize,
}

impl CacheStats {
    /// Creates a zeroed counter set.
    pub fn new() -> CacheStats {
        CacheStats::default()
    }

    /// Records a cache hit.
    pub fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a cache miss.
    pub fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a value stored into the cache.
    pub fn load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an entry removed by the eviction policy.
    pub fn evict(&self) {
        self.evicts.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a command that was not eligible for caching.
    pub fn non_cacheable(&self) {
        self.non_cacheable.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a full cache flush.
    pub fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    /// Records `count` entries dropped because the server reported their
    /// keys as changed.
    pub fn invalidation_by_server(&self, count: usize) {
        self.invalidations_by_server
            .fetch_add(count, Ordering::Relaxed);
    }

    /// Records one received invalidation notification, whether or not it
    /// removed anything.
    pub fn invalidation_message(&self) {
        self.invalidation_messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of lookups answered from the cache.
    pub fn hit_count(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of lookups that had to go to the server.
    pub fn miss_count(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    /// Number of values stored.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    /// Number of entries evicted by the policy.
    pub fn evict_count(&self) -> usize {
        self.evicts.load(Ordering::Relaxed)
    }

    /// Number of commands that bypassed the cache.
    pub fn non_cacheable_count(&self) -> usize {
        self.non_cacheable.load(Ordering::Relaxed)
    }

    /// Number of full flushes.
    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Number of entries dropped due to server invalidations.
    pub fn invalidation_by_server_count(&self) -> usize {
        self.invalidations_by_server.load(Ordering::Relaxed)
    }

    /// Number of invalidation notifications received.
    pub fn invalidation_message_count(&self) -> usize {
        self.invalidation_messages.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, loads: {}, evicts: {}, non-cacheable: {}, \
             flushes: {}, invalidations by server: {}, invalidation messages: {} }}",
            self.hit_count(),
            self.miss_count(),
            self.load_count(),
            self.evict_count(),
            self.non_cacheable_count(),
            self.flush_count(),
            self.invalidation_by_server_count(),
            self.invalidation_message_count(),
        )
    }
}
