use std::fmt;
use std::sync::Arc;

use crate::cmd::Cmd;
use crate::commands::key_argument_range;
use crate::types::Value;

/// Identity of a cacheable command.
///
/// Two keys are equal when the underlying commands are equal: same name,
/// same argument bytes, same order.  The command is kept behind an `Arc` so
/// the same key can live in the store, in the reverse index and in the
/// eviction policy's bookkeeping without copying the argument buffer.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    cmd: Arc<Cmd>,
}

impl CacheKey {
    /// Creates a cache key from a command.
    pub fn new(cmd: Cmd) -> CacheKey {
        CacheKey { cmd: Arc::new(cmd) }
    }

    /// Returns the wrapped command.
    pub fn command(&self) -> &Cmd {
        &self.cmd
    }

    /// Returns the command's name, i.e. its first argument.
    pub fn command_name(&self) -> Option<&[u8]> {
        self.cmd.command_name()
    }

    /// Returns the redis keys the command reads.  These are the keys the
    /// reverse index is built from: when the server reports one of them as
    /// changed, this cache key must be dropped.
    pub fn redis_keys(&self) -> Vec<&[u8]> {
        let name = match self.cmd.command_name() {
            Some(name) => name,
            None => return vec![],
        };
        key_argument_range(name, self.cmd.arg_count())
            .filter_map(|idx| self.cmd.arg_idx(idx))
            .collect()
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CacheKey").field(&self.cmd).finish()
    }
}

/// A stored command result.
///
/// Entries are immutable; a new entry is allocated on every store.  The
/// optional connection address records which connection produced the value,
/// for diagnostics only - an entry never holds an I/O handle.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    key: CacheKey,
    value: Value,
    con_addr: Option<Arc<String>>,
}

impl CacheEntry {
    /// Creates an entry for `key` holding `value`.
    pub fn new(key: CacheKey, value: Value) -> CacheEntry {
        CacheEntry {
            key,
            value,
            con_addr: None,
        }
    }

    /// Tags the entry with the address of the connection that produced it.
    pub fn with_connection_addr(mut self, con_addr: Option<Arc<String>>) -> CacheEntry {
        self.con_addr = con_addr;
        self
    }

    /// The key this entry is stored under.
    pub fn cache_key(&self) -> &CacheKey {
        &self.key
    }

    /// The cached command result.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The address of the connection that produced the value, when known.
    pub fn connection_addr(&self) -> Option<&Arc<String>> {
        self.con_addr.as_ref()
    }
}
