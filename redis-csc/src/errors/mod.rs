//! Error types the library surfaces.

mod redis_error;

pub use redis_error::*;
