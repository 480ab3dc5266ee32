//! Error taxonomy for the networking layer.
//!
//! Every failure surfaced by this crate is a [`NetError`]: a tagged [`ErrorKind`]
//! plus an optional human readable message and an optional underlying cause. The
//! kinds are grouped so callers can catch coarse families without caring about the
//! precise cause:
//!
//! - [`NetError::is_socket`] covers bind, connect, routing and generic socket
//!   failures.
//! - [`NetError::is_interrupted`] covers interrupted I/O, of which a socket timeout
//!   is one flavour. Callers that retry after a timeout but not after a reset only
//!   need this check.

use std::error::Error as StdError;
use std::fmt;
use std::io;

/// Boxed underlying cause carried by a [`NetError`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NetError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Host name could not be resolved.
    UnknownHost,
    /// Local address could not be bound.
    Bind,
    /// Remote refused or could not accept the connection.
    Connect,
    /// No route to the remote host.
    NoRouteToHost,
    /// ICMP port unreachable.
    PortUnreachable,
    /// A read or accept timed out.
    SocketTimeout,
    /// Any other socket level failure.
    Socket,
    /// An I/O operation was interrupted before completion.
    InterruptedIo,
    /// Malformed data on the wire.
    Protocol,
    /// No handler for a MIME type, or an operation the connection mode forbids.
    UnknownService,
    /// The URL could not be parsed or is unusable.
    MalformedUrl,
    /// A request needs to be retried but cannot be (e.g. streamed body).
    HttpRetry,
    /// Generic I/O failure, also used for cache and cookie store failures.
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownHost => "unknown host",
            ErrorKind::Bind => "cannot bind address",
            ErrorKind::Connect => "connection failed",
            ErrorKind::NoRouteToHost => "no route to host",
            ErrorKind::PortUnreachable => "port unreachable",
            ErrorKind::SocketTimeout => "socket timed out",
            ErrorKind::Socket => "socket error",
            ErrorKind::InterruptedIo => "i/o interrupted",
            ErrorKind::Protocol => "protocol error",
            ErrorKind::UnknownService => "unknown service",
            ErrorKind::MalformedUrl => "malformed url",
            ErrorKind::HttpRetry => "http retry required",
            ErrorKind::Io => "i/o error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A networking error: kind, optional message and optional cause.
#[derive(Debug, thiserror::Error)]
#[error("{}", render(.kind, .message))]
pub struct NetError {
    kind: ErrorKind,
    message: Option<String>,
    #[source]
    source: Option<BoxError>,
}

fn render(kind: &ErrorKind, message: &Option<String>) -> String {
    match message {
        Some(msg) => format!("{kind}: {msg}"),
        None => kind.to_string(),
    }
}

impl NetError {
    /// Creates an error of `kind` without message or cause.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Creates an error of `kind` with a message.
    pub fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: Some(message.into()),
            source: None,
        }
    }

    /// Attaches an underlying cause, replacing any previous one.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Shorthand for an [`ErrorKind::Io`] error with a message.
    pub fn io(message: impl Into<String>) -> Self {
        Self::with_message(ErrorKind::Io, message)
    }

    /// True for the socket family: bind, connect, no route, port unreachable and
    /// generic socket errors.
    pub fn is_socket(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Bind
                | ErrorKind::Connect
                | ErrorKind::NoRouteToHost
                | ErrorKind::PortUnreachable
                | ErrorKind::Socket
        )
    }

    /// True for interrupted I/O, including socket timeouts.
    pub fn is_interrupted(&self) -> bool {
        matches!(self.kind, ErrorKind::InterruptedIo | ErrorKind::SocketTimeout)
    }
}

impl From<ErrorKind> for NetError {
    fn from(kind: ErrorKind) -> Self {
        NetError::new(kind)
    }
}

impl From<io::Error> for NetError {
    fn from(err: io::Error) -> Self {
        use std::io::ErrorKind as Io;

        let kind = match err.kind() {
            Io::ConnectionRefused => ErrorKind::Connect,
            Io::ConnectionReset | Io::ConnectionAborted | Io::NotConnected | Io::BrokenPipe => {
                ErrorKind::Socket
            }
            Io::AddrInUse | Io::AddrNotAvailable => ErrorKind::Bind,
            Io::TimedOut | Io::WouldBlock => ErrorKind::SocketTimeout,
            Io::Interrupted => ErrorKind::InterruptedIo,
            Io::InvalidData => ErrorKind::Protocol,
            _ => ErrorKind::Io,
        };

        NetError::with_message(kind, err.to_string()).with_source(err)
    }
}

impl From<NetError> for io::Error {
    fn from(err: NetError) -> Self {
        let kind = match err.kind {
            ErrorKind::Connect => io::ErrorKind::ConnectionRefused,
            ErrorKind::Bind => io::ErrorKind::AddrInUse,
            ErrorKind::SocketTimeout => io::ErrorKind::TimedOut,
            ErrorKind::InterruptedIo => io::ErrorKind::Interrupted,
            ErrorKind::Protocol => io::ErrorKind::InvalidData,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

impl From<url::ParseError> for NetError {
    fn from(err: url::ParseError) -> Self {
        NetError::with_message(ErrorKind::MalformedUrl, err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for NetError {
    fn from(err: serde_json::Error) -> Self {
        NetError::with_message(ErrorKind::Io, err.to_string()).with_source(err)
    }
}

impl From<reqwest::Error> for NetError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ErrorKind::SocketTimeout
        } else if err.is_connect() {
            ErrorKind::Connect
        } else if err.is_builder() {
            ErrorKind::MalformedUrl
        } else if err.is_decode() {
            ErrorKind::Protocol
        } else {
            ErrorKind::Io
        };
        NetError::with_message(kind, err.to_string()).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_interrupted_but_not_socket() {
        let err = NetError::new(ErrorKind::SocketTimeout);
        assert!(err.is_interrupted());
        assert!(!err.is_socket());
    }

    #[test]
    fn socket_family() {
        for kind in [
            ErrorKind::Bind,
            ErrorKind::Connect,
            ErrorKind::NoRouteToHost,
            ErrorKind::PortUnreachable,
            ErrorKind::Socket,
        ] {
            assert!(NetError::new(kind).is_socket(), "{kind:?}");
        }
        assert!(!NetError::new(ErrorKind::UnknownHost).is_socket());
        assert!(!NetError::new(ErrorKind::Io).is_socket());
    }

    #[test]
    fn display_includes_message() {
        let err = NetError::with_message(ErrorKind::UnknownHost, "nope.invalid");
        assert_eq!(err.to_string(), "unknown host: nope.invalid");
        assert_eq!(NetError::new(ErrorKind::Bind).to_string(), "cannot bind address");
    }

    #[test]
    fn io_errors_keep_their_cause() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let err: NetError = io_err.into();
        assert_eq!(err.kind(), ErrorKind::Connect);
        let source = err.source().expect("source kept");
        assert!(source.downcast_ref::<io::Error>().is_some());
    }

    #[test]
    fn io_timeout_maps_to_socket_timeout() {
        let err: NetError = io::Error::from(io::ErrorKind::TimedOut).into();
        assert_eq!(err.kind(), ErrorKind::SocketTimeout);
        assert!(err.is_interrupted());
    }

    #[test]
    fn url_errors_are_malformed_url() {
        let err: NetError = url::Url::parse("not a url").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::MalformedUrl);
    }

    #[test]
    fn converts_back_into_io_error() {
        let err = NetError::with_message(ErrorKind::SocketTimeout, "read");
        let io_err: io::Error = err.into();
        assert_eq!(io_err.kind(), io::ErrorKind::TimedOut);
    }
}
