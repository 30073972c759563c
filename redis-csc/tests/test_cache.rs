use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;

use redis_csc::caching::{
    build_cache, Cache, CacheConfig, CacheEntry, CacheKey, DefaultCache, InvalidationListener,
};
use redis_csc::{cmd, CachedConnection, ErrorKind, ProtocolVersion, PushKind, PushManager, Value};
use redis_csc_test::{MockCmd, MockRedisConnection};

macro_rules! assert_hit {
    ($cache:expr, $val:expr) => {
        assert_eq!($cache.get_stats().hit_count(), $val);
    };
}

macro_rules! assert_miss {
    ($cache:expr, $val:expr) => {
        assert_eq!($cache.get_stats().miss_count(), $val);
    };
}

fn new_cache(max_size: usize) -> DefaultCache {
    DefaultCache::new(NonZeroUsize::new(max_size).unwrap())
}

fn get_key(key: &str) -> CacheKey {
    let mut c = cmd("GET");
    c.arg(key);
    CacheKey::new(c)
}

fn hgetall_key(key: &str) -> CacheKey {
    let mut c = cmd("HGETALL");
    c.arg(key);
    CacheKey::new(c)
}

fn entry(key: &CacheKey, value: Value) -> CacheEntry {
    CacheEntry::new(key.clone(), value)
}

fn tracking_ok() -> MockCmd {
    MockCmd::new(cmd("CLIENT").arg("TRACKING").arg("ON"), Ok(Value::Okay))
}

#[test]
fn test_set_then_get_roundtrip() {
    let cache = new_cache(128);
    let key = get_key("foo");
    let stored = cache.set(key.clone(), entry(&key, Value::BulkString(b"bar".to_vec())));
    assert_eq!(stored.value(), &Value::BulkString(b"bar".to_vec()));

    let hit = cache.get(&key).expect("value must be cached");
    assert_eq!(hit.value(), &Value::BulkString(b"bar".to_vec()));
    assert_eq!(cache.size(), 1);
    assert_eq!(cache.max_size(), 128);
    assert_eq!(cache.cache_entries().len(), 1);
}

#[test]
fn test_bounded_size_evicts_exactly_one() {
    let cache = new_cache(4);
    for i in 0..5i64 {
        let key = get_key(&format!("key_{i}"));
        cache.set(key.clone(), entry(&key, Value::Int(i)));
    }
    assert_eq!(cache.size(), 4);
    let stats = cache.get_stats();
    assert_eq!(stats.evict_count(), 1);
    assert_eq!(stats.load_count(), 5);
    // The oldest key is the victim.
    assert!(!cache.has_cache_key(&get_key("key_0")));
    assert!(cache.has_cache_key(&get_key("key_4")));
}

#[test]
fn test_lru_order_follows_insertion() {
    let cache = new_cache(2);
    let (a, b, c) = (get_key("a"), get_key("b"), get_key("c"));
    cache.set(a.clone(), entry(&a, Value::Int(1)));
    cache.set(b.clone(), entry(&b, Value::Int(2)));
    cache.set(c.clone(), entry(&c, Value::Int(3)));

    assert_eq!(cache.size(), 2);
    assert!(!cache.has_cache_key(&a));
    assert!(cache.has_cache_key(&b));
    assert!(cache.has_cache_key(&c));
    assert_eq!(cache.get_stats().evict_count(), 1);
}

#[test]
fn test_targeted_invalidation() {
    let cache = new_cache(128);
    let user1_get = get_key("user:1");
    let user1_hgetall = hgetall_key("user:1");
    let user2_get = get_key("user:2");
    for key in [&user1_get, &user1_hgetall, &user2_get] {
        cache.set(key.clone(), entry(key, Value::Int(1)));
    }

    let mut removed = cache.delete_by_redis_key(b"user:1");
    removed.sort_by_key(|key| key.command_name().map(<[u8]>::to_vec));
    assert_eq!(removed, vec![user1_get.clone(), user1_hgetall.clone()]);

    assert!(!cache.has_cache_key(&user1_get));
    assert!(!cache.has_cache_key(&user1_hgetall));
    assert!(cache.has_cache_key(&user2_get));
    assert_eq!(cache.size(), 1);

    let stats = cache.get_stats();
    assert_eq!(stats.invalidation_by_server_count(), 2);
    assert_eq!(stats.invalidation_message_count(), 1);
}

#[test]
fn test_invalidation_message_counted_even_when_empty() {
    let cache = new_cache(16);
    assert!(cache.delete_by_redis_key(b"never:seen").is_empty());
    let stats = cache.get_stats();
    assert_eq!(stats.invalidation_message_count(), 1);
    assert_eq!(stats.invalidation_by_server_count(), 0);
}

#[test]
fn test_multi_key_command_is_dropped_through_any_of_its_keys() {
    let cache = new_cache(16);
    let mut mget = cmd("MGET");
    mget.arg("a").arg("b");
    let mget_key = CacheKey::new(mget);
    cache.set(
        mget_key.clone(),
        entry(&mget_key, Value::Array(vec![Value::Int(1), Value::Int(2)])),
    );

    let removed = cache.delete_by_redis_key(b"b");
    assert_eq!(removed, vec![mget_key.clone()]);
    assert_eq!(cache.size(), 0);
    // The other key's index entry went with it.
    assert!(cache.delete_by_redis_key(b"a").is_empty());
}

#[test]
fn test_flush_on_none_payload() {
    let cache = new_cache(16);
    for name in ["a", "b", "c"] {
        let key = get_key(name);
        cache.set(key.clone(), entry(&key, Value::Int(1)));
    }
    let removed = cache.delete_by_redis_keys(None).unwrap();
    assert!(removed.is_empty());
    assert_eq!(cache.size(), 0);
    assert_eq!(cache.get_and_reset_stats().flush_count(), 1);
    assert_eq!(cache.get_stats().flush_count(), 0);
}

#[test]
fn test_delete_batch_preserves_order() {
    let cache = new_cache(16);
    let (a, b) = (get_key("a"), get_key("b"));
    cache.set(a.clone(), entry(&a, Value::Int(1)));

    let results = cache.delete_all(&[b.clone(), a.clone(), a.clone()]);
    assert_eq!(results, vec![false, true, false]);
    assert_eq!(cache.size(), 0);
}

#[test]
fn test_cacheability_allow_list() {
    let cache = new_cache(16);
    let mut set = cmd("SET");
    set.arg("k").arg("v");
    assert!(!cache.is_cacheable(&CacheKey::new(set)));
    assert!(cache.is_cacheable(&get_key("k")));
    assert!(cache.is_cacheable(&hgetall_key("k")));
}

#[test]
fn test_stats_reset_swaps_in_fresh_counters() {
    let cache = new_cache(16);
    let key = get_key("foo");
    cache.set(key.clone(), entry(&key, Value::Int(1)));
    cache.delete_by_redis_key(b"foo");

    let old = cache.get_and_reset_stats();
    assert_eq!(old.load_count(), 1);
    assert_eq!(old.invalidation_message_count(), 1);

    let fresh = cache.get_stats();
    assert_eq!(fresh.load_count(), 0);
    assert_eq!(fresh.invalidation_message_count(), 0);
}

#[test]
fn test_index_consistency_after_mixed_operations() {
    let cache = new_cache(64);
    let keys: Vec<CacheKey> = (0..8).map(|i| get_key(&format!("user:{i}"))).collect();
    for key in &keys {
        cache.set(key.clone(), entry(key, Value::Int(1)));
    }
    // Delete half explicitly, flush nothing else away.
    for key in &keys[0..4] {
        assert!(cache.delete(key));
    }
    // Index entries for deleted keys must be gone.
    for i in 0..4 {
        assert!(cache
            .delete_by_redis_key(format!("user:{i}").as_bytes())
            .is_empty());
    }
    // Remaining entries are still reachable through the index.
    for (i, key) in keys.iter().enumerate().skip(4) {
        let removed = cache.delete_by_redis_key(format!("user:{i}").as_bytes());
        assert_eq!(removed, vec![key.clone()]);
    }
    assert_eq!(cache.size(), 0);
}

#[test]
fn test_concurrent_sets_with_overlapping_redis_keys() {
    const THREADS: usize = 8;
    const KEYS_PER_THREAD: usize = 25;

    let cache: Arc<dyn Cache> = Arc::new(new_cache(1024));
    let mut handles = Vec::new();
    for t in 0..THREADS {
        let cache = cache.clone();
        handles.push(thread::spawn(move || {
            for i in 0..KEYS_PER_THREAD {
                // Distinct cache keys which all read the shared redis key.
                let mut c = cmd("MGET");
                c.arg("shared").arg(format!("own:{t}:{i}"));
                let key = CacheKey::new(c);
                let value = Value::Array(vec![Value::Int(1), Value::Int(i as i64)]);
                cache.set(key.clone(), CacheEntry::new(key, value));
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cache.size(), THREADS * KEYS_PER_THREAD);
    assert_eq!(cache.get_stats().load_count(), THREADS * KEYS_PER_THREAD);

    // No lost updates: one invalidation of the shared key must drop every
    // entry written by every thread.
    let removed = cache.delete_by_redis_key(b"shared");
    assert_eq!(removed.len(), THREADS * KEYS_PER_THREAD);
    assert_eq!(cache.size(), 0);
}

#[test]
fn test_cached_connection_requires_resp3() {
    let con = MockRedisConnection::new(vec![]).with_protocol(ProtocolVersion::RESP2);
    let cache = build_cache(&CacheConfig::new()).unwrap();
    let err = CachedConnection::new(con, cache).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RESP3NotSupported);
}

#[test]
fn test_cached_connection_enables_tracking_and_caches_reads() {
    let mock = MockRedisConnection::new(vec![
        tracking_ok(),
        MockCmd::new(cmd("GET").arg("key_1"), Ok("1")),
        MockCmd::new(cmd("SET").arg("key_1").arg("2"), Ok(Value::Okay)),
    ]);
    let cache = build_cache(&CacheConfig::new()).unwrap();
    let mut con = CachedConnection::new(mock.clone(), cache.clone()).unwrap();

    let val: String = cmd("GET").arg("key_1").query(&mut con).unwrap();
    assert_eq!(val, "1");
    assert_hit!(cache, 0);
    assert_miss!(cache, 1);

    // Served from the cache; the mock has no second GET queued.
    let val: String = cmd("GET").arg("key_1").query(&mut con).unwrap();
    assert_eq!(val, "1");
    assert_hit!(cache, 1);
    assert_miss!(cache, 1);

    // Writes pass through and are counted as non-cacheable.
    let _: () = cmd("SET").arg("key_1").arg("2").query(&mut con).unwrap();
    assert_eq!(cache.get_stats().non_cacheable_count(), 1);
    assert!(mock.is_empty());
}

#[test]
fn test_cached_connection_entry_is_tagged_with_provenance() {
    let mock = MockRedisConnection::new(vec![
        tracking_ok(),
        MockCmd::new(cmd("GET").arg("key_1"), Ok("1")),
    ]);
    let cache = build_cache(&CacheConfig::new()).unwrap();
    let mut con = CachedConnection::new(mock, cache.clone()).unwrap();
    let _: String = cmd("GET").arg("key_1").query(&mut con).unwrap();

    let entries = cache.cache_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0].connection_addr().map(|addr| addr.as_str()),
        Some("redis://mock")
    );
}

#[test]
fn test_invalidation_end_to_end_through_push_manager() {
    let mock = MockRedisConnection::new(vec![
        tracking_ok(),
        MockCmd::new(cmd("GET").arg("key_1"), Ok("1")),
        MockCmd::new(cmd("GET").arg("key_1"), Ok("2")),
    ]);
    let cache = build_cache(&CacheConfig::new()).unwrap();
    let mut con = CachedConnection::new(mock, cache.clone()).unwrap();

    let push_manager = PushManager::new();
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    push_manager.replace_sender(tx);
    let mut listener = InvalidationListener::new(cache.clone(), rx);

    let val: String = cmd("GET").arg("key_1").query(&mut con).unwrap();
    assert_eq!(val, "1");
    assert_eq!(cache.size(), 1);

    // The server reports key_1 as changed; the connection's read path
    // forwards the push and the listener applies it.
    let addr = Arc::new("redis://mock".to_string());
    push_manager.try_send_raw(
        &Value::Push {
            kind: PushKind::Invalidate,
            data: vec![Value::Array(vec![Value::BulkString(b"key_1".to_vec())])],
        },
        &addr,
    );
    assert_eq!(listener.drain(), 1);
    assert_eq!(cache.size(), 0);

    // The next read goes to the server again and sees the new value.
    let val: String = cmd("GET").arg("key_1").query(&mut con).unwrap();
    assert_eq!(val, "2");
    assert_miss!(cache, 2);
    assert_eq!(cache.get_stats().invalidation_message_count(), 1);
}

#[test]
fn test_tracking_rejection_fails_attach() {
    let mock = MockRedisConnection::new(vec![MockCmd::new(
        cmd("CLIENT").arg("TRACKING").arg("ON"),
        Ok(Value::SimpleString("ERR unknown".to_string())),
    )]);
    let cache = build_cache(&CacheConfig::new()).unwrap();
    let err = CachedConnection::new(mock, cache).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ClientError);
}
