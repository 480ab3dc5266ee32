//! Typed socket options.
//!
//! A [`SocketOption<T>`] names an option and fixes the type of its value, so
//! `options.set(TCP_NODELAY, 64)` does not compile. [`SocketOptions`] collects
//! values and applies them to a connected [`TcpStream`].
use std::fmt;
use std::marker::PhantomData;
use std::net::TcpStream;
use std::time::Duration;

use log::debug;

use crate::errors::{ErrorKind, NetError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum OptionKey {
    NoDelay,
    Ttl,
    ReadTimeout,
    WriteTimeout,
}

impl OptionKey {
    fn name(&self) -> &'static str {
        match self {
            OptionKey::NoDelay => "TCP_NODELAY",
            OptionKey::Ttl => "IP_TTL",
            OptionKey::ReadTimeout => "SO_READ_TIMEOUT",
            OptionKey::WriteTimeout => "SO_WRITE_TIMEOUT",
        }
    }
}

pub struct SocketOption<T> {
    key: OptionKey,
    _value: PhantomData<fn() -> T>,
}

impl<T> SocketOption<T> {
    const fn new(key: OptionKey) -> Self {
        Self {
            key,
            _value: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.key.name()
    }
}

impl<T> Clone for SocketOption<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SocketOption<T> {}

impl<T> fmt::Debug for SocketOption<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Disable Nagle's algorithm.
pub const TCP_NODELAY: SocketOption<bool> = SocketOption::new(OptionKey::NoDelay);
/// Time-to-live for outgoing packets.
pub const IP_TTL: SocketOption<u32> = SocketOption::new(OptionKey::Ttl);
/// Read timeout; `None` blocks forever.
pub const SO_READ_TIMEOUT: SocketOption<Option<Duration>> = SocketOption::new(OptionKey::ReadTimeout);
/// Write timeout; `None` blocks forever.
pub const SO_WRITE_TIMEOUT: SocketOption<Option<Duration>> = SocketOption::new(OptionKey::WriteTimeout);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    U32(u32),
    Timeout(Option<Duration>),
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Bool(v)
    }
}

impl From<u32> for OptionValue {
    fn from(v: u32) -> Self {
        OptionValue::U32(v)
    }
}

impl From<Option<Duration>> for OptionValue {
    fn from(v: Option<Duration>) -> Self {
        OptionValue::Timeout(v)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SocketOptions {
    values: Vec<(OptionKey, OptionValue)>,
}

impl SocketOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `option`, replacing an earlier value for it.
    pub fn set<T: Into<OptionValue>>(&mut self, option: SocketOption<T>, value: T) -> &mut Self {
        let value = value.into();
        match self.values.iter_mut().find(|(k, _)| *k == option.key) {
            Some(slot) => slot.1 = value,
            None => self.values.push((option.key, value)),
        }
        self
    }

    pub fn get<T>(&self, option: SocketOption<T>) -> Option<OptionValue> {
        self.values
            .iter()
            .find(|(k, _)| *k == option.key)
            .map(|(_, v)| *v)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Applies every option in insertion order. Stops at the first failure, which
    /// is reported as an [`ErrorKind::Socket`] error naming the option.
    pub fn apply_to(&self, stream: &TcpStream) -> Result<()> {
        for (key, value) in &self.values {
            let applied = match (key, value) {
                (OptionKey::NoDelay, OptionValue::Bool(v)) => stream.set_nodelay(*v),
                (OptionKey::Ttl, OptionValue::U32(v)) => stream.set_ttl(*v),
                (OptionKey::ReadTimeout, OptionValue::Timeout(v)) => stream.set_read_timeout(*v),
                (OptionKey::WriteTimeout, OptionValue::Timeout(v)) => stream.set_write_timeout(*v),
                _ => {
                    return Err(NetError::with_message(
                        ErrorKind::Socket,
                        format!("bad value {value:?} for {}", key.name()),
                    ))
                }
            };

            applied.map_err(|e| {
                NetError::with_message(ErrorKind::Socket, format!("cannot set {}", key.name()))
                    .with_source(e)
            })?;
            debug!("set {} to {value:?}", key.name());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn connected() -> (TcpStream, TcpListener) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let stream = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        (stream, listener)
    }

    #[test]
    fn applies_options_to_stream() {
        let (stream, _listener) = connected();
        let mut options = SocketOptions::new();
        options
            .set(TCP_NODELAY, true)
            .set(IP_TTL, 42)
            .set(SO_READ_TIMEOUT, Some(Duration::from_millis(250)))
            .set(SO_WRITE_TIMEOUT, None);

        options.apply_to(&stream).unwrap();
        assert!(stream.nodelay().unwrap());
        assert_eq!(stream.ttl().unwrap(), 42);
        // the kernel rounds timeouts up to its tick
        let read_timeout = stream.read_timeout().unwrap().unwrap();
        assert!(read_timeout >= Duration::from_millis(250), "{read_timeout:?}");
        assert!(read_timeout < Duration::from_millis(300), "{read_timeout:?}");
        assert_eq!(stream.write_timeout().unwrap(), None);
    }

    #[test]
    fn later_set_replaces_earlier() {
        let mut options = SocketOptions::new();
        options.set(IP_TTL, 1).set(IP_TTL, 2);
        assert_eq!(options.get(IP_TTL), Some(OptionValue::U32(2)));
        assert_eq!(options.get(TCP_NODELAY), None);
    }

    #[test]
    fn zero_timeout_is_socket_error() {
        let (stream, _listener) = connected();
        let mut options = SocketOptions::new();
        options.set(SO_READ_TIMEOUT, Some(Duration::ZERO));

        let err = options.apply_to(&stream).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Socket);
        assert!(err.is_socket());
        assert!(err.to_string().contains("SO_READ_TIMEOUT"));
    }

    #[test]
    fn option_names() {
        assert_eq!(TCP_NODELAY.name(), "TCP_NODELAY");
        assert_eq!(format!("{:?}", SO_WRITE_TIMEOUT), "SO_WRITE_TIMEOUT");
    }
}
