//! redis-csc is a Rust Redis client library built around server-assisted
//! client-side caching.  It keeps a bounded local cache of command results
//! and relies on the server's RESP3 invalidation push messages to drop
//! entries whose keys changed, so repeated reads of stable keys never leave
//! the process.
//!
//! The crate is called `redis-csc` and you can depend on it via cargo:
//!
//! ```ini
//! [dependencies]
//! redis-csc = "0.1"
//! ```
//!
//! # Basic Operation
//!
//! The cache is built from a [`caching::CacheConfig`] and shared by every
//! connection attached to it.  Wrapping a connection in
//! [`CachedConnection`] makes cacheable reads consult the cache first:
//!
//! ```rust,no_run
//! use redis_csc::caching::{build_cache, CacheConfig};
//! use redis_csc::{cmd, CachedConnection, ConnectionLike, RedisResult};
//!
//! fn do_something(con: impl ConnectionLike) -> RedisResult<()> {
//!     let cache = build_cache(&CacheConfig::new())?;
//!     let mut con = CachedConnection::new(con, cache)?;
//!
//!     // The first read goes to the server, the second one is local.
//!     let _: Option<String> = cmd("GET").arg("my_key").query(&mut con)?;
//!     let _: Option<String> = cmd("GET").arg("my_key").query(&mut con)?;
//!     Ok(())
//! }
//! ```
//!
//! Attaching requires a RESP3 connection; on older protocols there is no
//! invalidation channel and construction fails rather than serving
//! potentially stale values.
//!
//! # Invalidation
//!
//! Connections forward out-of-band push messages through a [`PushManager`].
//! An [`caching::InvalidationListener`] on the receiving end translates
//! them into cache invalidations:
//!
//! ```rust,no_run
//! use redis_csc::caching::{build_cache, CacheConfig, InvalidationListener};
//! use redis_csc::PushManager;
//!
//! let cache = build_cache(&CacheConfig::new()).unwrap();
//! let push_manager = PushManager::new();
//! let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
//! push_manager.replace_sender(tx);
//! let listener = InvalidationListener::new(cache.clone(), rx);
//! std::thread::spawn(move || listener.run_blocking());
//! ```
//!
//! # Cacheability
//!
//! Only a fixed allow-list of read-only, deterministic commands is cached
//! by default; see [`caching::DefaultCacheable`].  Custom rules plug in
//! through [`caching::Cacheable`], and custom cache implementations through
//! [`caching::CacheBuilder`].

#![deny(non_camel_case_types)]
#![warn(missing_docs)]

// public api
pub use crate::cmd::{cmd, Cmd};
pub use crate::connection::{CachedConnection, ConnectionLike, ProtocolVersion};
pub use crate::errors::{ErrorKind, RedisError};
pub use crate::push_manager::{PushInfo, PushManager};

// preserve grouping and order
#[rustfmt::skip]
pub use crate::types::{
    // utility functions
    from_redis_value,
    from_owned_redis_value,

    // conversion traits
    FromRedisValue,
    ToRedisArgs,
    RedisWrite,

    // result type
    RedisResult,

    // low level values
    Value,
    PushKind,
};

mod macros;

pub mod caching;
pub mod errors;

mod cmd;
mod commands;
mod connection;
mod push_manager;
mod types;
