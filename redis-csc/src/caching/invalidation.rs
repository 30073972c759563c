use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::mpsc::UnboundedReceiver;

use super::{Cache, CacheKey};
use crate::push_manager::PushInfo;
use crate::types::{PushKind, RedisResult, Value};

/// Applies one push notification to the cache.
///
/// Only `invalidate` pushes are acted on; every other kind is ignored and
/// returns an empty list.  An invalidate payload is either an array of the
/// redis keys that changed, or nil when the server's tracking table
/// overflowed and the entire cache must be dropped.
pub fn handle_push(cache: &dyn Cache, push_info: &PushInfo) -> RedisResult<Vec<CacheKey>> {
    if push_info.kind != PushKind::Invalidate {
        return Ok(Vec::new());
    }
    match push_info.data.first() {
        Some(Value::Array(redis_keys)) => cache.delete_by_redis_keys(Some(redis_keys)),
        Some(Value::Nil) | None => cache.delete_by_redis_keys(None),
        // Some servers deliver a single changed key without the wrapping
        // array.  Anything that is not a valid key representation fails
        // before the cache is touched.
        Some(other) => cache.delete_by_redis_keys(Some(std::slice::from_ref(other))),
    }
}

/// Consumes push notifications from a connection and turns them into cache
/// invalidations.
///
/// The listener owns the receiving end of the channel a
/// [`PushManager`](crate::PushManager) feeds.  It only takes the cache lock
/// for the duration of applying one notification, never while waiting for
/// the next one.
pub struct InvalidationListener {
    cache: Arc<dyn Cache>,
    receiver: UnboundedReceiver<PushInfo>,
}

impl InvalidationListener {
    /// Creates a listener invalidating `cache` from `receiver`.
    pub fn new(cache: Arc<dyn Cache>, receiver: UnboundedReceiver<PushInfo>) -> Self {
        InvalidationListener { cache, receiver }
    }

    /// Applies every notification currently queued, without blocking.
    /// Returns the number of notifications handled.
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(push_info) = self.receiver.try_recv() {
            self.apply(&push_info);
            handled += 1;
        }
        handled
    }

    /// Blocks on the channel until the sending side closes, applying every
    /// notification as it arrives.  Meant to run on a dedicated thread.
    pub fn run_blocking(mut self) {
        while let Some(push_info) = self.receiver.blocking_recv() {
            self.apply(&push_info);
        }
        debug!("push channel closed, invalidation listener stopping");
    }

    fn apply(&self, push_info: &PushInfo) {
        match handle_push(&*self.cache, push_info) {
            Ok(removed) if !removed.is_empty() => {
                debug!(
                    "invalidated {} cache entries (addr: {})",
                    removed.len(),
                    push_info.con_addr
                );
            }
            Ok(_) => {}
            Err(err) => {
                // A malformed payload must not take the listener down;
                // later notifications can still be valid.
                warn!("dropping invalidation message: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caching::{CacheEntry, DefaultCache};
    use crate::cmd::cmd;
    use crate::errors::ErrorKind;
    use std::num::NonZeroUsize;

    fn get_key(key: &str) -> CacheKey {
        let mut c = cmd("GET");
        c.arg(key);
        CacheKey::new(c)
    }

    fn populated_cache() -> DefaultCache {
        let cache = DefaultCache::new(NonZeroUsize::new(16).unwrap());
        for name in ["user:1", "user:2"] {
            let key = get_key(name);
            let entry = CacheEntry::new(key.clone(), Value::Int(1));
            cache.set(key, entry);
        }
        cache
    }

    fn invalidate(data: Vec<Value>) -> PushInfo {
        PushInfo {
            kind: PushKind::Invalidate,
            data,
            con_addr: Arc::new("redis://127.0.0.1:6379".to_string()),
        }
    }

    #[test]
    fn test_key_list_payload() {
        let cache = populated_cache();
        let removed = handle_push(
            &cache,
            &invalidate(vec![Value::Array(vec![Value::BulkString(
                b"user:1".to_vec(),
            )])]),
        )
        .unwrap();
        assert_eq!(removed, vec![get_key("user:1")]);
        assert_eq!(cache.size(), 1);
        assert!(cache.has_cache_key(&get_key("user:2")));
    }

    #[test]
    fn test_nil_payload_flushes() {
        let cache = populated_cache();
        let removed = handle_push(&cache, &invalidate(vec![Value::Nil])).unwrap();
        assert!(removed.is_empty());
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.get_stats().flush_count(), 1);
    }

    #[test]
    fn test_non_invalidate_kinds_are_ignored() {
        let cache = populated_cache();
        let push_info = PushInfo {
            kind: PushKind::Message,
            data: vec![Value::BulkString(b"user:1".to_vec())],
            con_addr: Arc::new("redis://127.0.0.1:6379".to_string()),
        };
        assert!(handle_push(&cache, &push_info).unwrap().is_empty());
        assert_eq!(cache.size(), 2);
    }

    #[test]
    fn test_malformed_payload_is_rejected_without_mutation() {
        let cache = populated_cache();
        let err = handle_push(&cache, &invalidate(vec![Value::Int(42)])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(cache.size(), 2);
    }

    #[test]
    fn test_listener_drains_queued_notifications() {
        let cache: Arc<DefaultCache> = Arc::new(populated_cache());
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let dyn_cache: Arc<dyn Cache> = cache.clone();
        let mut listener = InvalidationListener::new(dyn_cache, rx);

        tx.send(invalidate(vec![Value::Array(vec![Value::BulkString(
            b"user:1".to_vec(),
        )])]))
        .unwrap();
        tx.send(invalidate(vec![Value::Array(vec![Value::BulkString(
            b"user:2".to_vec(),
        )])]))
        .unwrap();

        assert_eq!(listener.drain(), 2);
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.get_stats().invalidation_message_count(), 2);
        assert_eq!(listener.drain(), 0);
    }
}
