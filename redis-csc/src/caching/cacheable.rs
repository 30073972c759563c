use std::collections::HashSet;

use crate::commands::is_default_cacheable_cmd;

/// Decides whether a command is eligible for client-side caching at all.
///
/// Implementations must be pure: the answer may depend only on the command
/// name and the redis keys it reads, never on ambient state.
pub trait Cacheable: Send + Sync {
    /// Returns true when the result of `command_name` over `redis_keys` may
    /// be cached.
    fn is_cacheable(&self, command_name: &[u8], redis_keys: &[&[u8]]) -> bool;
}

impl<F> Cacheable for F
where
    F: Fn(&[u8], &[&[u8]]) -> bool + Send + Sync,
{
    fn is_cacheable(&self, command_name: &[u8], redis_keys: &[&[u8]]) -> bool {
        self(command_name, redis_keys)
    }
}

/// The default eligibility rule: a fixed allow-list of read-only,
/// deterministic commands, and the command must read at least one key.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultCacheable;

impl Cacheable for DefaultCacheable {
    fn is_cacheable(&self, command_name: &[u8], redis_keys: &[&[u8]]) -> bool {
        !redis_keys.is_empty() && is_default_cacheable_cmd(command_name)
    }
}

/// Layers allow/deny lists over the default rule.
///
/// A command passes when it is in the allow list (or the allow list is
/// empty and the command passes [`DefaultCacheable`]), is not in the deny
/// list, and reads no denied key.
#[derive(Default)]
pub struct AllowDenyCacheable {
    allow_commands: HashSet<Vec<u8>>,
    deny_commands: HashSet<Vec<u8>>,
    deny_keys: HashSet<Vec<u8>>,
}

impl AllowDenyCacheable {
    /// Creates a rule equivalent to [`DefaultCacheable`].
    pub fn new() -> AllowDenyCacheable {
        AllowDenyCacheable::default()
    }

    /// Restricts caching to `command`.  May be called multiple times; once
    /// any command is allowed explicitly, the default allow-list no longer
    /// applies.
    pub fn allow_command(mut self, command: impl Into<Vec<u8>>) -> Self {
        self.allow_commands.insert(command.into());
        self
    }

    /// Excludes `command` from caching.
    pub fn deny_command(mut self, command: impl Into<Vec<u8>>) -> Self {
        self.deny_commands.insert(command.into());
        self
    }

    /// Excludes any command reading `redis_key` from caching.
    pub fn deny_key(mut self, redis_key: impl Into<Vec<u8>>) -> Self {
        self.deny_keys.insert(redis_key.into());
        self
    }
}

impl Cacheable for AllowDenyCacheable {
    fn is_cacheable(&self, command_name: &[u8], redis_keys: &[&[u8]]) -> bool {
        if redis_keys.is_empty() || self.deny_commands.contains(command_name) {
            return false;
        }
        if redis_keys.iter().any(|key| self.deny_keys.contains(*key)) {
            return false;
        }
        if self.allow_commands.is_empty() {
            is_default_cacheable_cmd(command_name)
        } else {
            self.allow_commands.contains(command_name)
        }
    }
}
