//! Testing support
//!
//! This module provides `MockRedisConnection` which implements
//! `ConnectionLike` and can be used in the same place as any other type that
//! behaves like a Redis connection.  This is useful for writing unit tests
//! without needing a Redis server.
//!
//! # Example
//!
//! ```rust
//! use redis_csc::{ConnectionLike, RedisError};
//! use redis_csc_test::{MockCmd, MockRedisConnection};
//!
//! fn my_exists<C: ConnectionLike>(conn: &mut C, key: &str) -> Result<bool, RedisError> {
//!     let exists: bool = redis_csc::cmd("EXISTS").arg(key).query(conn)?;
//!     Ok(exists)
//! }
//!
//! let mut mock_connection = MockRedisConnection::new(vec![
//!     MockCmd::new(redis_csc::cmd("EXISTS").arg("foo"), Ok(1)),
//! ]);
//!
//! let result = my_exists(&mut mock_connection, "foo").unwrap();
//! assert_eq!(result, true);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use redis_csc::{
    Cmd, ConnectionLike, ErrorKind, ProtocolVersion, RedisError, RedisResult, Value,
};

/// Helper trait for converting test values into a `redis_csc::Value` returned
/// from a `MockRedisConnection`.  This is necessary because neither
/// `ToRedisArgs` nor `FromRedisValue` performs the precise conversion needed.
pub trait IntoRedisValue {
    /// Convert a value into `redis_csc::Value`.
    fn into_redis_value(self) -> Value;
}

macro_rules! into_redis_value_impl_int {
    ($t:ty) => {
        impl IntoRedisValue for $t {
            fn into_redis_value(self) -> Value {
                Value::Int(self as i64)
            }
        }
    };
}

into_redis_value_impl_int!(i8);
into_redis_value_impl_int!(i16);
into_redis_value_impl_int!(i32);
into_redis_value_impl_int!(i64);
into_redis_value_impl_int!(u8);
into_redis_value_impl_int!(u16);
into_redis_value_impl_int!(u32);

impl IntoRedisValue for String {
    fn into_redis_value(self) -> Value {
        Value::BulkString(self.into_bytes())
    }
}

impl IntoRedisValue for &str {
    fn into_redis_value(self) -> Value {
        Value::BulkString(self.as_bytes().to_vec())
    }
}

impl IntoRedisValue for bool {
    fn into_redis_value(self) -> Value {
        Value::Boolean(self)
    }
}

impl IntoRedisValue for Vec<u8> {
    fn into_redis_value(self) -> Value {
        Value::BulkString(self)
    }
}

impl IntoRedisValue for Vec<Value> {
    fn into_redis_value(self) -> Value {
        Value::Array(self)
    }
}

impl IntoRedisValue for Value {
    fn into_redis_value(self) -> Value {
        self
    }
}

/// Helper trait for converting `redis_csc::Cmd` references into the owned
/// command a `MockCmd` stores.
pub trait IntoRedisCmd {
    /// Convert into an owned command.
    fn into_redis_cmd(self) -> Cmd;
}

impl IntoRedisCmd for Cmd {
    fn into_redis_cmd(self) -> Cmd {
        self
    }
}

impl IntoRedisCmd for &Cmd {
    fn into_redis_cmd(self) -> Cmd {
        self.clone()
    }
}

impl IntoRedisCmd for &mut Cmd {
    fn into_redis_cmd(self) -> Cmd {
        self.clone()
    }
}

/// Represents a command to be executed against a `MockRedisConnection`.
pub struct MockCmd {
    cmd: Cmd,
    response: RedisResult<Value>,
}

impl MockCmd {
    /// Create a new `MockCmd` given a Redis command and either a value
    /// convertible to a `redis_csc::Value` or a `RedisError`.
    pub fn new<C, V>(cmd: C, response: Result<V, RedisError>) -> Self
    where
        C: IntoRedisCmd,
        V: IntoRedisValue,
    {
        MockCmd {
            cmd: cmd.into_redis_cmd(),
            response: response.map(IntoRedisValue::into_redis_value),
        }
    }
}

/// A mock Redis connection for testing without a server.
/// `MockRedisConnection` checks whether the client submits a specific
/// sequence of commands and generates an error if it does not.
#[derive(Clone)]
pub struct MockRedisConnection {
    commands: Arc<Mutex<VecDeque<MockCmd>>>,
    protocol: ProtocolVersion,
    addr: Arc<String>,
}

impl MockRedisConnection {
    /// Construct a new RESP3 mock from the given sequence of commands.
    pub fn new<I>(commands: I) -> Self
    where
        I: IntoIterator<Item = MockCmd>,
    {
        MockRedisConnection {
            commands: Arc::new(Mutex::new(VecDeque::from_iter(commands))),
            protocol: ProtocolVersion::RESP3,
            addr: Arc::new("redis://mock".to_string()),
        }
    }

    /// Overrides the protocol version the mock reports.
    pub fn with_protocol(mut self, protocol: ProtocolVersion) -> Self {
        self.protocol = protocol;
        self
    }

    /// Returns whether every expected command has been consumed.
    pub fn is_empty(&self) -> bool {
        self.commands.lock().unwrap().is_empty()
    }
}

impl ConnectionLike for MockRedisConnection {
    fn req_command(&mut self, cmd: &Cmd) -> RedisResult<Value> {
        let mut commands = self.commands.lock().unwrap();
        let next_cmd = commands.pop_front().ok_or_else(|| {
            RedisError::from((ErrorKind::ClientError, "TEST", "unexpected command".to_owned()))
        })?;

        if *cmd != next_cmd.cmd {
            return Err(RedisError::from((
                ErrorKind::ClientError,
                "TEST",
                format!(
                    "unexpected command: expected={:?}, actual={:?}",
                    next_cmd.cmd, cmd,
                ),
            )));
        }

        next_cmd.response
    }

    fn protocol(&self) -> ProtocolVersion {
        self.protocol
    }

    fn connection_addr(&self) -> Option<Arc<String>> {
        Some(self.addr.clone())
    }
}
