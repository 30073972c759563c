//! Server-assisted client-side caching.
//! <https://redis.io/docs/manual/client-side-caching/>
//!
//! A bounded local cache of command results, kept consistent with the
//! server through RESP3 invalidation push messages.  The cache itself never
//! talks to the server: connections feed it results on misses, and the
//! invalidation listener feeds it the keys the server reports as changed.

mod cache;
mod cache_key;
mod cacheable;
mod config;
mod eviction;
mod invalidation;
mod stats;

pub use cache::{Cache, DefaultCache};
pub use cache_key::{CacheEntry, CacheKey};
pub use cacheable::{AllowDenyCacheable, Cacheable, DefaultCacheable};
pub use config::{build_cache, CacheBuilder, CacheConfig};
pub use eviction::{EvictionPolicy, LruEvictionPolicy};
pub use invalidation::{handle_push, InvalidationListener};
pub use stats::CacheStats;
