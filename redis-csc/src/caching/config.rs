use std::num::NonZeroUsize;
use std::sync::Arc;

use super::{Cache, Cacheable, DefaultCache, DefaultCacheable, EvictionPolicy, LruEvictionPolicy};
use crate::types::RedisResult;

type PolicyFactory = dyn Fn(NonZeroUsize) -> Box<dyn EvictionPolicy> + Send + Sync;

/// Builds a custom [`Cache`] implementation from the configured parts.
///
/// This is how alternative cache implementations plug into the library: a
/// builder value resolved at configuration time, handed the bound, the
/// eviction policy and the cacheable rule.  A failing builder aborts cache
/// setup; the client then has to run without a cache.
pub trait CacheBuilder: Send + Sync {
    /// Builds the cache.
    fn build(
        &self,
        max_size: NonZeroUsize,
        policy: Box<dyn EvictionPolicy>,
        cacheable: Arc<dyn Cacheable>,
    ) -> RedisResult<Arc<dyn Cache>>;
}

/// Configuration for client side caching.
///
/// ```rust
/// use std::num::NonZeroUsize;
/// use redis_csc::caching::{build_cache, CacheConfig};
///
/// let config = CacheConfig::new().set_max_size(NonZeroUsize::new(128).unwrap());
/// let cache = build_cache(&config).unwrap();
/// assert_eq!(cache.max_size(), 128);
/// ```
#[derive(Clone)]
pub struct CacheConfig {
    max_size: NonZeroUsize,
    policy_factory: Option<Arc<PolicyFactory>>,
    cacheable: Arc<dyn Cacheable>,
    cache_builder: Option<Arc<dyn CacheBuilder>>,
}

impl CacheConfig {
    /// Creates a new `CacheConfig` with default values: 10 000 entries, LRU
    /// eviction sized to the bound, the default cacheable rule, and the
    /// built-in cache implementation.
    pub fn new() -> CacheConfig {
        CacheConfig {
            max_size: NonZeroUsize::new(10_000).unwrap(),
            policy_factory: None,
            cacheable: Arc::new(DefaultCacheable),
            cache_builder: None,
        }
    }

    /// Sets the maximum entry count for the cache.
    pub fn set_max_size(mut self, max_size: NonZeroUsize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Selects the eviction policy by supplying its constructor; it will be
    /// invoked with the configured maximum size.
    pub fn set_eviction_policy<F>(mut self, factory: F) -> Self
    where
        F: Fn(NonZeroUsize) -> Box<dyn EvictionPolicy> + Send + Sync + 'static,
    {
        self.policy_factory = Some(Arc::new(factory));
        self
    }

    /// Replaces the cacheable rule.
    pub fn set_cacheable(mut self, cacheable: Arc<dyn Cacheable>) -> Self {
        self.cacheable = cacheable;
        self
    }

    /// Uses a custom cache implementation instead of the built-in one.
    pub fn set_cache_builder(mut self, builder: Arc<dyn CacheBuilder>) -> Self {
        self.cache_builder = Some(builder);
        self
    }

    /// The configured maximum entry count.
    pub fn max_size(&self) -> NonZeroUsize {
        self.max_size
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig::new()
    }
}

/// Builds the cache described by `config`.
///
/// Construction failures come from custom builders only and are fatal for
/// cache setup: the error must not be swallowed, the caller either aborts
/// or continues without caching.
pub fn build_cache(config: &CacheConfig) -> RedisResult<Arc<dyn Cache>> {
    let policy = match &config.policy_factory {
        Some(factory) => factory(config.max_size),
        None => Box::new(LruEvictionPolicy::new(config.max_size)),
    };
    match &config.cache_builder {
        Some(builder) => builder.build(config.max_size, policy, config.cacheable.clone()),
        None => Ok(Arc::new(DefaultCache::with_parts(
            config.max_size,
            policy,
            config.cacheable.clone(),
        ))),
    }
}
