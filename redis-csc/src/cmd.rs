use std::fmt;

use crate::connection::ConnectionLike;
use crate::types::{from_owned_redis_value, FromRedisValue, RedisResult, RedisWrite, ToRedisArgs};

/// Represents redis commands.
///
/// A command acts as a builder interface to creating encoded redis
/// requests.  This allows you to easily assemble a command by chaining
/// arguments together.
///
/// Basic example:
///
/// ```rust
/// redis_csc::Cmd::new().arg("GET").arg("my_key");
/// ```
///
/// There is also a helper function called `cmd` which makes it a
/// tiny bit shorter:
///
/// ```rust
/// redis_csc::cmd("GET").arg("my_key");
/// ```
///
/// All arguments are stored back to back in one buffer; the command name is
/// simply the first argument.  Two commands are equal when their buffers and
/// argument boundaries are equal, which is what gives cache keys their
/// identity.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Cmd {
    data: Vec<u8>,
    // Offsets into `data` marking the end of each argument.
    args: Vec<usize>,
}

impl RedisWrite for Cmd {
    fn write_arg(&mut self, arg: &[u8]) {
        self.data.extend_from_slice(arg);
        self.args.push(self.data.len());
    }

    fn write_arg_fmt(&mut self, arg: impl fmt::Display) {
        use std::io::Write;
        write!(self.data, "{arg}").unwrap();
        self.args.push(self.data.len());
    }
}

impl Cmd {
    /// Creates a new empty command.
    pub fn new() -> Cmd {
        Cmd {
            data: vec![],
            args: vec![],
        }
    }

    /// Creates a new empty command, with at least the requested capacity.
    pub fn with_capacity(arg_count: usize, size_of_data: usize) -> Cmd {
        Cmd {
            data: Vec::with_capacity(size_of_data),
            args: Vec::with_capacity(arg_count),
        }
    }

    /// Appends an argument to the command.  The argument passed must
    /// be a type that implements `ToRedisArgs`.  Most primitive types as
    /// well as vectors of primitive types implement it.
    ///
    /// For instance all of the following are valid:
    ///
    /// ```rust
    /// redis_csc::cmd("SET").arg(&b"my_key"[..]).arg(42);
    /// redis_csc::cmd("SET").arg("my_key").arg("my_value");
    /// ```
    #[inline]
    pub fn arg<T: ToRedisArgs>(&mut self, arg: T) -> &mut Cmd {
        arg.write_redis_args(self);
        self
    }

    /// Returns the number of arguments in this command, the command name
    /// included.
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Returns true when no argument has been written yet.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Returns an iterator over the arguments in this command, the command
    /// name included.
    pub fn args_iter(&self) -> impl Clone + ExactSizeIterator<Item = &[u8]> {
        self.args
            .iter()
            .enumerate()
            .map(|(i, &end)| self.arg_start(i, end))
    }

    /// Returns the argument at `idx`, the command name being index 0.
    pub fn arg_idx(&self, idx: usize) -> Option<&[u8]> {
        let end = *self.args.get(idx)?;
        Some(self.arg_start(idx, end))
    }

    /// Returns the command name, i.e. the first argument.
    pub fn command_name(&self) -> Option<&[u8]> {
        self.arg_idx(0)
    }

    /// Sends the command to the given connection and converts the result.
    ///
    /// ```rust,no_run
    /// # fn do_something(con: &mut impl redis_csc::ConnectionLike) -> redis_csc::RedisResult<()> {
    /// let value: Option<String> = redis_csc::cmd("GET").arg("my_key").query(con)?;
    /// # Ok(()) }
    /// ```
    #[inline]
    pub fn query<T: FromRedisValue>(&self, con: &mut dyn ConnectionLike) -> RedisResult<T> {
        match con.req_command(self) {
            Ok(val) => from_owned_redis_value(val),
            Err(e) => Err(e),
        }
    }

    fn arg_start(&self, idx: usize, end: usize) -> &[u8] {
        let start = if idx == 0 { 0 } else { self.args[idx - 1] };
        &self.data[start..end]
    }
}

impl fmt::Debug for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.args_iter().map(String::from_utf8_lossy))
            .finish()
    }
}

/// Shortcut function to creating a command with a single argument.
///
/// The first argument of a redis command is always the name of the command
/// which needs to be a string.  This is the recommended way to start a
/// command pipe.
///
/// ```rust
/// redis_csc::cmd("PING");
/// ```
pub fn cmd(name: &str) -> Cmd {
    let mut rv = Cmd::new();
    rv.arg(name);
    rv
}
