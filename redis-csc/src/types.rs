use std::fmt;

use crate::errors::{ErrorKind, RedisError};

macro_rules! invalid_type_error {
    ($v:expr, $det:expr) => {{
        fail!(invalid_type_error_inner!($v, $det))
    }};
}

macro_rules! invalid_type_error_inner {
    ($v:expr, $det:expr) => {
        RedisError::from((
            ErrorKind::UnexpectedReturnType,
            "Response was of incompatible type",
            format!("{:?} (response was {:?})", $det, $v),
        ))
    };
}

/// Library generic result type.
pub type RedisResult<T> = Result<T, RedisError>;

/// Different push notification kinds a RESP3 connection can deliver
/// out-of-band.
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum PushKind {
    /// `invalidate` is received when a key is changed/deleted on the server
    /// while being tracked for the client-side cache.
    Invalidate,
    /// `message` is received when pubsub message published by another client.
    Message,
    /// `pmessage` is received when pubsub message published by another client
    /// and client subscribed to topic via pattern.
    PMessage,
    /// `smessage` is received when pubsub message published by another client
    /// and client subscribed to it with sharding.
    SMessage,
    /// `subscribe` is received when client subscribed to a topic.
    Subscribe,
    /// `psubscribe` is received when client subscribed to a pattern.
    PSubscribe,
    /// `ssubscribe` is received when client subscribed to a shard topic.
    SSubscribe,
    /// `unsubscribe` is received when client unsubscribed from a topic.
    Unsubscribe,
    /// `punsubscribe` is received when client unsubscribed from a pattern.
    PUnsubscribe,
    /// `sunsubscribe` is received when client unsubscribed from a shard topic.
    SUnsubscribe,
    /// Connection was disconnected.
    Disconnection,
    /// Any other push kind the server may introduce.
    Other(String),
}

/// Internal low-level redis value enum, shaped after the RESP3 reply types.
#[derive(PartialEq, Clone, Debug)]
pub enum Value {
    /// A nil response from the server.
    Nil,
    /// An integer response.  Note that there are a few situations
    /// in which redis actually returns a string for an integer which
    /// is why this library generally treats integers and strings
    /// the same for all numeric responses.
    Int(i64),
    /// An arbitrary binary data, usually represents a binary-safe string.
    BulkString(Vec<u8>),
    /// A response containing an array with more data. This is generally used
    /// by redis to express nested structures.
    Array(Vec<Value>),
    /// A simple string response, without line breaks and not binary safe.
    SimpleString(String),
    /// A status response which represents the string "OK".
    Okay,
    /// Unordered key,value list from the server. Use `as_map_iter` function.
    Map(Vec<(Value, Value)>),
    /// Unordered set of values from the server.
    Set(Vec<Value>),
    /// A floating number response from the server.
    Double(f64),
    /// A boolean response from the server.
    Boolean(bool),
    /// Push data from the server. Push messages are not responses to
    /// commands; they arrive out-of-band on the same connection.
    Push {
        /// Push Kind
        kind: PushKind,
        /// Remaining data from push message
        data: Vec<Value>,
    },
}

impl Value {
    /// Returns an iterator of `(&Value, &Value)` if `self` is compatible with
    /// a map type.
    pub fn as_map_iter(&self) -> Option<impl Iterator<Item = (&Value, &Value)>> {
        match self {
            Value::Map(items) => Some(items.iter().map(|(k, v)| (k, v))),
            _ => None,
        }
    }

    /// Checks if the value is okay.
    pub fn looks_like_okay(&self) -> bool {
        match self {
            Value::Okay => true,
            Value::SimpleString(s) => s == "OK",
            _ => false,
        }
    }
}

/// Accepts the byte form of command arguments.
pub trait RedisWrite {
    /// Accepts a serialized redis command argument.
    fn write_arg(&mut self, arg: &[u8]);

    /// Accepts a displayable redis command argument.
    fn write_arg_fmt(&mut self, arg: impl fmt::Display) {
        self.write_arg(arg.to_string().as_bytes())
    }
}

impl RedisWrite for Vec<Vec<u8>> {
    fn write_arg(&mut self, arg: &[u8]) {
        self.push(arg.to_owned());
    }

    fn write_arg_fmt(&mut self, arg: impl fmt::Display) {
        self.push(arg.to_string().into_bytes())
    }
}

/// Used to convert a value into one or multiple redis argument
/// strings.  Most values will produce exactly one item but in
/// some cases it might make sense to produce more than one.
pub trait ToRedisArgs: Sized {
    /// This converts the value into a vector of bytes.  Each item
    /// is a single argument.  Most items generate a vector of a
    /// single item.
    fn to_redis_args(&self) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        self.write_redis_args(&mut out);
        out
    }

    /// This writes the value into a vector of bytes.  Each item
    /// is a single argument.  Most items generate a single item.
    ///
    /// The exception to this rule currently are vectors of items.
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite;
}

macro_rules! fmt_based_to_redis_impl {
    ($t:ty) => {
        impl ToRedisArgs for $t {
            fn write_redis_args<W>(&self, out: &mut W)
            where
                W: ?Sized + RedisWrite,
            {
                out.write_arg_fmt(self)
            }
        }
    };
}

fmt_based_to_redis_impl!(i8);
fmt_based_to_redis_impl!(i16);
fmt_based_to_redis_impl!(i32);
fmt_based_to_redis_impl!(i64);
fmt_based_to_redis_impl!(u8);
fmt_based_to_redis_impl!(u16);
fmt_based_to_redis_impl!(u32);
fmt_based_to_redis_impl!(u64);
fmt_based_to_redis_impl!(usize);
fmt_based_to_redis_impl!(isize);

impl ToRedisArgs for String {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(self.as_bytes())
    }
}

impl ToRedisArgs for &str {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(self.as_bytes())
    }
}

impl ToRedisArgs for Vec<u8> {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(self)
    }
}

impl ToRedisArgs for &[u8] {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(self)
    }
}

impl<T: ToRedisArgs> ToRedisArgs for &T {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        (*self).write_redis_args(out)
    }
}

/// This trait is used to convert a redis value into a more appropriate
/// type.
pub trait FromRedisValue: Sized {
    /// Given a redis `Value` this attempts to convert it into the given
    /// destination type.  If that fails because it's not compatible an
    /// appropriate error is generated.
    fn from_redis_value(v: &Value) -> RedisResult<Self>;

    /// Given a redis `Value` this attempts to convert it into the given
    /// destination type.  If that fails because it's not compatible an
    /// appropriate error is generated.
    fn from_owned_redis_value(v: Value) -> RedisResult<Self> {
        // By default, fall back to `from_redis_value`.
        // This function only needs to be implemented if it can benefit
        // from taking `v` by value.
        Self::from_redis_value(&v)
    }

    /// Convert a redis `Value` into a `Vec<Self>`.
    ///
    /// This is a specialization hook used by the `FromRedisValue` impl for
    /// `Vec<T>`. The default handles sequence-shaped values by converting each
    /// element; types like `u8` override it so that `Vec<u8>` can be produced
    /// from binary payloads (which cannot be expressed via the generic
    /// per-element path without violating trait coherence).
    fn from_redis_value_vec(v: &Value) -> RedisResult<Vec<Self>> {
        match v {
            Value::Array(items) | Value::Set(items) => {
                items.iter().map(FromRedisValue::from_redis_value).collect()
            }
            Value::Nil => Ok(vec![]),
            _ => invalid_type_error!(v, "Response type not vector compatible."),
        }
    }

    /// Owned counterpart to [`from_redis_value_vec`](Self::from_redis_value_vec).
    fn from_owned_redis_value_vec(v: Value) -> RedisResult<Vec<Self>> {
        match v {
            Value::Array(items) | Value::Set(items) => items
                .into_iter()
                .map(FromRedisValue::from_owned_redis_value)
                .collect(),
            Value::Nil => Ok(vec![]),
            _ => invalid_type_error!(v, "Response type not vector compatible."),
        }
    }
}

macro_rules! from_redis_value_for_num {
    ($t:ty) => {
        impl FromRedisValue for $t {
            fn from_redis_value(v: &Value) -> RedisResult<$t> {
                match *v {
                    Value::Int(val) => Ok(val as $t),
                    Value::SimpleString(ref s) => match s.parse::<$t>() {
                        Ok(rv) => Ok(rv),
                        Err(_) => invalid_type_error!(v, "Could not convert from string."),
                    },
                    Value::BulkString(ref bytes) => match std::str::from_utf8(bytes)
                        .ok()
                        .and_then(|s| s.parse::<$t>().ok())
                    {
                        Some(rv) => Ok(rv),
                        None => invalid_type_error!(v, "Could not convert from string."),
                    },
                    _ => invalid_type_error!(v, "Response type not convertible to numeric."),
                }
            }
        }
    };
}

from_redis_value_for_num!(i8);
from_redis_value_for_num!(i16);
from_redis_value_for_num!(i32);
from_redis_value_for_num!(i64);
from_redis_value_for_num!(u16);
from_redis_value_for_num!(u32);
from_redis_value_for_num!(u64);
from_redis_value_for_num!(usize);
from_redis_value_for_num!(isize);

impl FromRedisValue for bool {
    fn from_redis_value(v: &Value) -> RedisResult<bool> {
        match *v {
            Value::Nil => Ok(false),
            Value::Int(val) => Ok(val != 0),
            Value::Boolean(b) => Ok(b),
            Value::SimpleString(ref s) => {
                if s == "1" {
                    Ok(true)
                } else if s == "0" {
                    Ok(false)
                } else {
                    invalid_type_error!(v, "Response status not valid boolean");
                }
            }
            Value::Okay => Ok(true),
            _ => invalid_type_error!(v, "Response type not bool compatible."),
        }
    }
}

impl FromRedisValue for String {
    fn from_redis_value(v: &Value) -> RedisResult<String> {
        match v {
            Value::BulkString(bytes) => Ok(String::from_utf8_lossy(bytes).into_owned()),
            Value::Okay => Ok("OK".to_string()),
            Value::SimpleString(val) => Ok(val.to_string()),
            Value::Int(val) => Ok(val.to_string()),
            Value::Double(val) => Ok(val.to_string()),
            _ => invalid_type_error!(v, "Response type not string compatible."),
        }
    }
}

impl FromRedisValue for u8 {
    fn from_redis_value(v: &Value) -> RedisResult<u8> {
        match *v {
            Value::Int(val) => Ok(val as u8),
            Value::SimpleString(ref s) => match s.parse::<u8>() {
                Ok(rv) => Ok(rv),
                Err(_) => invalid_type_error!(v, "Could not convert from string."),
            },
            Value::BulkString(ref bytes) => match std::str::from_utf8(bytes)
                .ok()
                .and_then(|s| s.parse::<u8>().ok())
            {
                Some(rv) => Ok(rv),
                None => invalid_type_error!(v, "Could not convert from string."),
            },
            _ => invalid_type_error!(v, "Response type not convertible to numeric."),
        }
    }

    // Specialize `Vec<u8>` to work with binary data, whereas all other element
    // types fall back to the generic per-element conversion.
    fn from_redis_value_vec(v: &Value) -> RedisResult<Vec<u8>> {
        match v {
            Value::BulkString(bytes) => Ok(bytes.clone()),
            Value::SimpleString(s) => Ok(s.as_bytes().to_vec()),
            _ => invalid_type_error!(v, "Response type not byte-string compatible."),
        }
    }

    fn from_owned_redis_value_vec(v: Value) -> RedisResult<Vec<u8>> {
        match v {
            Value::BulkString(bytes) => Ok(bytes),
            Value::SimpleString(s) => Ok(s.into_bytes()),
            _ => invalid_type_error!(v, "Response type not byte-string compatible."),
        }
    }
}

impl<T: FromRedisValue> FromRedisValue for Option<T> {
    fn from_redis_value(v: &Value) -> RedisResult<Option<T>> {
        match v {
            Value::Nil => Ok(None),
            _ => Ok(Some(FromRedisValue::from_redis_value(v)?)),
        }
    }

    fn from_owned_redis_value(v: Value) -> RedisResult<Option<T>> {
        match v {
            Value::Nil => Ok(None),
            _ => Ok(Some(FromRedisValue::from_owned_redis_value(v)?)),
        }
    }
}

impl<T: FromRedisValue> FromRedisValue for Vec<T> {
    fn from_redis_value(v: &Value) -> RedisResult<Vec<T>> {
        T::from_redis_value_vec(v)
    }

    fn from_owned_redis_value(v: Value) -> RedisResult<Vec<T>> {
        T::from_owned_redis_value_vec(v)
    }
}

impl FromRedisValue for Value {
    fn from_redis_value(v: &Value) -> RedisResult<Value> {
        Ok(v.clone())
    }

    fn from_owned_redis_value(v: Value) -> RedisResult<Value> {
        Ok(v)
    }
}

impl FromRedisValue for () {
    fn from_redis_value(_v: &Value) -> RedisResult<()> {
        Ok(())
    }
}

/// A shortcut function to invoke `FromRedisValue::from_redis_value`
/// to make the API slightly nicer.
pub fn from_redis_value<T: FromRedisValue>(v: &Value) -> RedisResult<T> {
    FromRedisValue::from_redis_value(v)
}

/// A shortcut function to invoke `FromRedisValue::from_owned_redis_value`
/// to make the API slightly nicer.
pub fn from_owned_redis_value<T: FromRedisValue>(v: Value) -> RedisResult<T> {
    FromRedisValue::from_owned_redis_value(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_conversions() {
        assert_eq!(from_redis_value::<i64>(&Value::Int(42)), Ok(42));
        assert_eq!(
            from_redis_value::<usize>(&Value::BulkString(b"17".to_vec())),
            Ok(17)
        );
        assert!(from_redis_value::<i64>(&Value::Nil).is_err());
    }

    #[test]
    fn test_option_is_miss_not_error() {
        assert_eq!(from_redis_value::<Option<String>>(&Value::Nil), Ok(None));
        assert_eq!(
            from_redis_value::<Option<String>>(&Value::BulkString(b"bar".to_vec())),
            Ok(Some("bar".to_string()))
        );
    }

    #[test]
    fn test_to_redis_args() {
        assert_eq!("key".to_redis_args(), vec![b"key".to_vec()]);
        assert_eq!(42i64.to_redis_args(), vec![b"42".to_vec()]);
        assert_eq!(b"raw".to_vec().to_redis_args(), vec![b"raw".to_vec()]);
    }
}
