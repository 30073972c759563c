use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use arc_swap::ArcSwap;
use dashmap::DashMap;

use super::{
    CacheEntry, CacheKey, CacheStats, Cacheable, DefaultCacheable, EvictionPolicy,
    LruEvictionPolicy,
};
use crate::errors::ErrorKind;
use crate::types::{RedisResult, Value};

/// The client-side cache contract.
///
/// One cache instance is shared by every connection attached to the same
/// cache configuration.  All mutating operations are atomic with respect to
/// each other: the store, the reverse index and the eviction policy are
/// only ever observed in a consistent state.  `get` and the plain accessors
/// are cheap and never wait for writers.
pub trait Cache: Send + Sync + std::fmt::Debug {
    /// Looks up an entry.  A lookup does not advance the entry's recency;
    /// only [`set`](Cache::set) does.
    fn get(&self, cache_key: &CacheKey) -> Option<CacheEntry>;

    /// Stores `entry` under `cache_key`, indexes the key under every redis
    /// key its command reads, and applies at most one pending eviction.
    /// Returns the stored entry.
    fn set(&self, cache_key: CacheKey, entry: CacheEntry) -> CacheEntry;

    /// Removes one entry.  Returns whether the store contained it.
    fn delete(&self, cache_key: &CacheKey) -> bool;

    /// Removes several entries under a single lock acquisition, returning
    /// one result per key, in order.
    fn delete_all(&self, cache_keys: &[CacheKey]) -> Vec<bool>;

    /// Drops every entry whose command reads `redis_key`, returning the
    /// removed cache keys.  Counts one invalidation message even when
    /// nothing was indexed under the key.
    fn delete_by_redis_key(&self, redis_key: &[u8]) -> Vec<CacheKey>;

    /// Applies [`delete_by_redis_key`](Cache::delete_by_redis_key) for every
    /// element of an invalidation payload under a single lock acquisition.
    ///
    /// `None` is the server's flush signal (its tracking table overflowed
    /// and it can no longer say which keys changed): the whole cache is
    /// flushed and an empty list returned.  A payload element that is not a
    /// binary or simple string fails with [`ErrorKind::InvalidArgument`]
    /// before anything is removed.
    fn delete_by_redis_keys(&self, redis_keys: Option<&[Value]>) -> RedisResult<Vec<CacheKey>>;

    /// Drops everything, resetting the eviction policy.  Returns how many
    /// entries were dropped.
    fn flush(&self) -> usize;

    /// Whether the key's command is eligible for caching at all.
    fn is_cacheable(&self, cache_key: &CacheKey) -> bool;

    /// Whether the store currently holds the key.
    fn has_cache_key(&self, cache_key: &CacheKey) -> bool;

    /// The bound the eviction policy enforces.
    fn max_size(&self) -> usize;

    /// Number of entries currently stored.
    fn size(&self) -> usize;

    /// A snapshot of all stored entries.
    fn cache_entries(&self) -> Vec<CacheEntry>;

    /// Short name of the eviction policy in use.
    fn policy_name(&self) -> &'static str;

    /// The live counter set.  Counters keep accumulating on the returned
    /// handle until [`get_and_reset_stats`](Cache::get_and_reset_stats)
    /// swaps it out.
    fn get_stats(&self) -> Arc<CacheStats>;

    /// Atomically replaces the counter set with a fresh zeroed one and
    /// returns the old counters.
    fn get_and_reset_stats(&self) -> Arc<CacheStats>;
}

/// Converts one element of an invalidation payload into reverse-index key
/// bytes.  Only binary and simple strings are valid redis keys here;
/// anything else is a programming error on the sending side and is
/// rejected before any store mutation.
pub(crate) fn index_key_bytes(value: &Value) -> RedisResult<Vec<u8>> {
    match value {
        Value::BulkString(bytes) => Ok(bytes.clone()),
        Value::SimpleString(text) => Ok(text.clone().into_bytes()),
        _ => fail!((
            ErrorKind::InvalidArgument,
            "Unsupported redis key representation",
            format!("{value:?}"),
        )),
    }
}

/// The default in-memory cache implementation.
///
/// The store and the reverse index are concurrent maps, which is what makes
/// lock-free `get` possible; the single mutex around the eviction policy
/// doubles as the cache-wide writer lock.  Within it, every mutating
/// operation runs store mutation, policy bookkeeping, index maintenance and
/// counter updates as one unit, in that order.
pub struct DefaultCache {
    max_size: usize,
    store: DashMap<CacheKey, CacheEntry>,
    redis_keys_to_cache_keys: DashMap<Vec<u8>, HashSet<CacheKey>>,
    policy: Mutex<Box<dyn EvictionPolicy>>,
    cacheable: Arc<dyn Cacheable>,
    stats: ArcSwap<CacheStats>,
}

impl std::fmt::Debug for DefaultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultCache")
            .field("max_size", &self.max_size)
            .finish_non_exhaustive()
    }
}

impl DefaultCache {
    /// Creates a cache bounded to `max_size` entries, with LRU eviction and
    /// the default cacheable rule.
    pub fn new(max_size: NonZeroUsize) -> DefaultCache {
        DefaultCache::with_parts(
            max_size,
            Box::new(LruEvictionPolicy::new(max_size)),
            Arc::new(DefaultCacheable),
        )
    }

    /// Creates a cache from explicit parts, as the configuration factory
    /// does.
    pub fn with_parts(
        max_size: NonZeroUsize,
        policy: Box<dyn EvictionPolicy>,
        cacheable: Arc<dyn Cacheable>,
    ) -> DefaultCache {
        DefaultCache {
            max_size: max_size.get(),
            store: DashMap::new(),
            redis_keys_to_cache_keys: DashMap::new(),
            policy: Mutex::new(policy),
            cacheable,
            stats: ArcSwap::from_pointee(CacheStats::new()),
        }
    }

    /// Grants access to the eviction policy.  The returned guard is the
    /// cache-wide writer lock; holding it blocks all mutating operations.
    pub fn eviction_policy(&self) -> MutexGuard<'_, Box<dyn EvictionPolicy>> {
        self.lock_policy()
    }

    /// Locks the policy mutex; a poisoned lock is recovered since the
    /// protected state stays consistent between operations.
    fn lock_policy(&self) -> MutexGuard<'_, Box<dyn EvictionPolicy>> {
        self.policy
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Removes `cache_key` from the store, the policy and every reverse
    /// index set of the redis keys it reads.  Must run under the lock.
    fn remove_locked(&self, policy: &mut Box<dyn EvictionPolicy>, cache_key: &CacheKey) -> bool {
        let removed = self.store.remove(cache_key).is_some();
        policy.reset(cache_key);
        for redis_key in cache_key.redis_keys() {
            let mut now_empty = false;
            if let Some(mut cache_keys) = self.redis_keys_to_cache_keys.get_mut(redis_key) {
                cache_keys.remove(cache_key);
                now_empty = cache_keys.is_empty();
            }
            if now_empty {
                self.redis_keys_to_cache_keys
                    .remove_if(redis_key, |_, cache_keys| cache_keys.is_empty());
            }
        }
        removed
    }

    /// `delete_by_redis_key` body, factored out so the batch variant can
    /// run every element under one lock acquisition.
    fn delete_by_redis_key_locked(
        &self,
        policy: &mut Box<dyn EvictionPolicy>,
        redis_key: &[u8],
    ) -> Vec<CacheKey> {
        let stats = self.get_stats();
        let mut removed = Vec::new();
        if let Some((_, cache_keys)) = self.redis_keys_to_cache_keys.remove(redis_key) {
            for cache_key in cache_keys {
                if self.remove_locked(policy, &cache_key) {
                    removed.push(cache_key);
                }
            }
            stats.invalidation_by_server(removed.len());
        }
        stats.invalidation_message();
        removed
    }

    fn flush_locked(&self, policy: &mut Box<dyn EvictionPolicy>) -> usize {
        let result = self.store.len();
        self.store.clear();
        self.redis_keys_to_cache_keys.clear();
        policy.reset_all();
        self.get_stats().flush();
        result
    }
}

impl Cache for DefaultCache {
    fn get(&self, cache_key: &CacheKey) -> Option<CacheEntry> {
        self.store.get(cache_key).map(|entry| entry.value().clone())
    }

    fn set(&self, cache_key: CacheKey, entry: CacheEntry) -> CacheEntry {
        let mut policy = self.lock_policy();
        self.store.insert(cache_key.clone(), entry.clone());
        policy.touch(&cache_key);
        if let Some(victim) = policy.evict_next() {
            self.remove_locked(&mut policy, &victim);
            self.get_stats().evict();
        }
        for redis_key in cache_key.redis_keys() {
            self.redis_keys_to_cache_keys
                .entry(redis_key.to_vec())
                .or_default()
                .insert(cache_key.clone());
        }
        self.get_stats().load();
        entry
    }

    fn delete(&self, cache_key: &CacheKey) -> bool {
        let mut policy = self.lock_policy();
        self.remove_locked(&mut policy, cache_key)
    }

    fn delete_all(&self, cache_keys: &[CacheKey]) -> Vec<bool> {
        let mut policy = self.lock_policy();
        cache_keys
            .iter()
            .map(|cache_key| self.remove_locked(&mut policy, cache_key))
            .collect()
    }

    fn delete_by_redis_key(&self, redis_key: &[u8]) -> Vec<CacheKey> {
        let mut policy = self.lock_policy();
        self.delete_by_redis_key_locked(&mut policy, redis_key)
    }

    fn delete_by_redis_keys(&self, redis_keys: Option<&[Value]>) -> RedisResult<Vec<CacheKey>> {
        let redis_keys = match redis_keys {
            Some(redis_keys) => redis_keys,
            None => {
                self.flush();
                return Ok(Vec::new());
            }
        };
        // Validate the whole payload before touching anything, so a bad
        // element cannot leave a partial removal behind.
        let index_keys = redis_keys
            .iter()
            .map(index_key_bytes)
            .collect::<RedisResult<Vec<_>>>()?;
        let mut policy = self.lock_policy();
        Ok(index_keys
            .iter()
            .flat_map(|redis_key| self.delete_by_redis_key_locked(&mut policy, redis_key))
            .collect())
    }

    fn flush(&self) -> usize {
        let mut policy = self.lock_policy();
        self.flush_locked(&mut policy)
    }

    fn is_cacheable(&self, cache_key: &CacheKey) -> bool {
        let command_name = match cache_key.command_name() {
            Some(name) => name,
            None => return false,
        };
        self.cacheable
            .is_cacheable(command_name, &cache_key.redis_keys())
    }

    fn has_cache_key(&self, cache_key: &CacheKey) -> bool {
        self.store.contains_key(cache_key)
    }

    fn max_size(&self) -> usize {
        self.max_size
    }

    fn size(&self) -> usize {
        self.store.len()
    }

    fn cache_entries(&self) -> Vec<CacheEntry> {
        self.store.iter().map(|entry| entry.value().clone()).collect()
    }

    fn policy_name(&self) -> &'static str {
        self.lock_policy().policy_name()
    }

    fn get_stats(&self) -> Arc<CacheStats> {
        self.stats.load_full()
    }

    fn get_and_reset_stats(&self) -> Arc<CacheStats> {
        self.stats.swap(Arc::new(CacheStats::new()))
    }
}
