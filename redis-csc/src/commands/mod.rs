use std::ops::Range;

/// Returns true when the command is in the default cacheable set: read-only,
/// deterministic commands whose result is fully determined by their
/// arguments.  Commands that mutate, return random members, or depend on
/// ambient server state (scans, ttls, random keys) are excluded.
pub(crate) fn is_default_cacheable_cmd(cmd: &[u8]) -> bool {
    matches!(
        cmd,
        // string
        b"GET"
            | b"GETRANGE"
            | b"MGET"
            | b"STRLEN"
            | b"SUBSTR"
            | b"LCS"
            | b"EXISTS"
            | b"TYPE"
            // bitmap
            | b"GETBIT"
            | b"BITCOUNT"
            | b"BITPOS"
            | b"BITFIELD_RO"
            // hash
            | b"HGET"
            | b"HGETALL"
            | b"HMGET"
            | b"HKEYS"
            | b"HVALS"
            | b"HLEN"
            | b"HEXISTS"
            | b"HSTRLEN"
            // list
            | b"LRANGE"
            | b"LINDEX"
            | b"LLEN"
            | b"LPOS"
            // set
            | b"SMEMBERS"
            | b"SISMEMBER"
            | b"SMISMEMBER"
            | b"SCARD"
            | b"SDIFF"
            | b"SINTER"
            | b"SUNION"
            // sorted set
            | b"ZCARD"
            | b"ZCOUNT"
            | b"ZLEXCOUNT"
            | b"ZSCORE"
            | b"ZMSCORE"
            | b"ZRANK"
            | b"ZREVRANK"
            | b"ZRANGE"
            | b"ZRANGEBYLEX"
            | b"ZRANGEBYSCORE"
            | b"ZREVRANGE"
            | b"ZREVRANGEBYLEX"
            | b"ZREVRANGEBYSCORE"
            // stream
            | b"XLEN"
            | b"XRANGE"
            | b"XREVRANGE"
            // json documents
            | b"JSON.GET"
            | b"JSON.MGET"
            | b"JSON.STRLEN"
            | b"JSON.ARRLEN"
            | b"JSON.ARRINDEX"
            | b"JSON.OBJKEYS"
            | b"JSON.OBJLEN"
            | b"JSON.TYPE"
            // time series
            | b"TS.GET"
            | b"TS.RANGE"
            | b"TS.REVRANGE"
    )
}

/// Returns the range of argument indexes holding the redis keys a command
/// reads.  Most commands carry a single key right after the command name;
/// the variadic read commands take keys in every position, JSON.MGET keeps
/// its path as the trailing argument and LCS compares exactly two keys.
pub(crate) fn key_argument_range(cmd: &[u8], arg_count: usize) -> Range<usize> {
    if arg_count < 2 {
        return 1..1;
    }
    match cmd {
        b"MGET" | b"EXISTS" | b"SDIFF" | b"SINTER" | b"SUNION" => 1..arg_count,
        b"JSON.MGET" => 1..(arg_count - 1).max(1),
        b"LCS" => 1..3.min(arg_count),
        _ => 1..2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list_excludes_mutation_and_randomness() {
        assert!(is_default_cacheable_cmd(b"GET"));
        assert!(is_default_cacheable_cmd(b"HGETALL"));
        assert!(is_default_cacheable_cmd(b"JSON.GET"));
        assert!(!is_default_cacheable_cmd(b"SET"));
        assert!(!is_default_cacheable_cmd(b"DEL"));
        assert!(!is_default_cacheable_cmd(b"SRANDMEMBER"));
        assert!(!is_default_cacheable_cmd(b"HRANDFIELD"));
        assert!(!is_default_cacheable_cmd(b"RANDOMKEY"));
        assert!(!is_default_cacheable_cmd(b"SCAN"));
        assert!(!is_default_cacheable_cmd(b"TTL"));
    }

    #[test]
    fn test_key_ranges() {
        assert_eq!(key_argument_range(b"GET", 2), 1..2);
        assert_eq!(key_argument_range(b"HGET", 3), 1..2);
        assert_eq!(key_argument_range(b"MGET", 4), 1..4);
        assert_eq!(key_argument_range(b"JSON.MGET", 4), 1..3);
        assert_eq!(key_argument_range(b"LCS", 3), 1..3);
        assert_eq!(key_argument_range(b"GET", 1), 1..1);
    }
}
