use std::sync::Arc;

use log::debug;

use crate::caching::{Cache, CacheEntry, CacheKey};
use crate::cmd::{cmd, Cmd};
use crate::errors::ErrorKind;
use crate::types::{RedisResult, Value};

/// Protocol version negotiated with the server.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub enum ProtocolVersion {
    /// RESP2 is the default protocol.
    #[default]
    RESP2,
    /// RESP3 protocol, which adds out-of-band push messages and with them
    /// server-assisted client-side caching.
    RESP3,
}

/// Implements the "stateless" part of the connection interface that is used
/// by the rest of the library: execute a command, get its decoded reply.
/// How the command travels over the wire is up to the implementation.
pub trait ConnectionLike {
    /// Sends an already encoded command into the TCP socket and
    /// reads the single response from it.
    fn req_command(&mut self, cmd: &Cmd) -> RedisResult<Value>;

    /// Returns the protocol version negotiated for this connection.
    fn protocol(&self) -> ProtocolVersion;

    /// Returns the address of this connection, when one is known.  Used to
    /// tag cache entries with their provenance.
    fn connection_addr(&self) -> Option<Arc<String>> {
        None
    }
}

/// A connection wrapper that consults a client-side cache before going to
/// the server.
///
/// Cacheable read commands are answered from the cache when present; on a
/// miss the command is executed on the inner connection and the reply is
/// stored.  Everything else passes straight through.  The wrapper never
/// performs I/O on a cache hit; staleness is handled exclusively by the
/// server's invalidation push messages.
///
/// Attaching requires a RESP3 connection, since invalidation messages only
/// exist as RESP3 out-of-band pushes.  On attach the wrapper issues
/// `CLIENT TRACKING ON` once so the server starts recording which keys this
/// connection has read.
pub struct CachedConnection<C> {
    con: C,
    cache: Arc<dyn Cache>,
}

impl<C> std::fmt::Debug for CachedConnection<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedConnection").finish_non_exhaustive()
    }
}

impl<C: ConnectionLike> CachedConnection<C> {
    /// Wraps `con`, enabling key tracking on it.
    ///
    /// Fails with [`ErrorKind::RESP3NotSupported`] when the connection did
    /// not negotiate RESP3, and with the server's error when the tracking
    /// setup command is rejected.
    pub fn new(con: C, cache: Arc<dyn Cache>) -> RedisResult<Self> {
        if con.protocol() != ProtocolVersion::RESP3 {
            fail!((
                ErrorKind::RESP3NotSupported,
                "Client-side caching requires the RESP3 protocol",
            ));
        }
        let mut connection = CachedConnection { con, cache };
        let reply = connection.con.req_command(&client_tracking_on())?;
        if !reply.looks_like_okay() {
            fail!((
                ErrorKind::ClientError,
                "CLIENT TRACKING ON was not accepted by the server",
                format!("{reply:?}"),
            ));
        }
        debug!(
            "client-side caching enabled (addr: {:?})",
            connection.con.connection_addr()
        );
        Ok(connection)
    }

    /// Returns the cache this connection consults.
    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    /// Consumes the wrapper, returning the inner connection.
    pub fn into_inner(self) -> C {
        self.con
    }

    fn req_command_cached(&mut self, command: &Cmd) -> RedisResult<Value> {
        let key = CacheKey::new(command.clone());
        let stats = self.cache.get_stats();
        if !self.cache.is_cacheable(&key) {
            stats.non_cacheable();
            return self.con.req_command(command);
        }
        if let Some(entry) = self.cache.get(&key) {
            stats.hit();
            return Ok(entry.value().clone());
        }
        stats.miss();
        let reply = self.con.req_command(command)?;
        let entry = CacheEntry::new(key.clone(), reply.clone())
            .with_connection_addr(self.con.connection_addr());
        self.cache.set(key, entry);
        Ok(reply)
    }
}

impl<C: ConnectionLike> ConnectionLike for CachedConnection<C> {
    fn req_command(&mut self, cmd: &Cmd) -> RedisResult<Value> {
        self.req_command_cached(cmd)
    }

    fn protocol(&self) -> ProtocolVersion {
        self.con.protocol()
    }

    fn connection_addr(&self) -> Option<Arc<String>> {
        self.con.connection_addr()
    }
}

fn client_tracking_on() -> Cmd {
    let mut rv = cmd("CLIENT");
    rv.arg("TRACKING").arg("ON");
    rv
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_tracking_cmd_shape() {
        let tracking = client_tracking_on();
        let args: Vec<&[u8]> = tracking.args_iter().collect();
        assert_eq!(args, vec![&b"CLIENT"[..], &b"TRACKING"[..], &b"ON"[..]]);
    }
}
