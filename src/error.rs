//! Pool error type.
use std::io;

use crate::http::UnknownMethod;
use crate::http::uri::InvalidUri;
use crate::proto::ProtoError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error returned from pool operations.
///
/// Every failure carries a distinct [`ErrorKind`], the underlying cause if any is available
/// from [`std::error::Error::source`].
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: ErrorKind,
    detail: Detail,
}

enum Detail {
    None,
    Message(&'static str),
    Source(BoxError),
}

/// Kind of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Establishing the TCP connection or TLS handshake exceeds the connect timeout.
    ConnectTimeout,
    /// Sending the request exceeds the write timeout.
    WriteTimeout,
    /// Receiving response bytes exceeds the read timeout.
    ReadTimeout,
    /// Waiting for a pool slot exceeds the pool timeout.
    PoolTimeout,
    /// Peer reset or EOF in the middle of a transaction.
    ConnectionClosed,
    /// Malformed status line, header block, or body framing.
    Protocol,
    /// TLS handshake or verification failure.
    Tls,
    /// TCP connect or name resolution failure.
    Connect,
    /// Other socket IO error.
    Io,
    /// Request URL cannot be parsed.
    InvalidUrl,
    /// Scheme is not supported, or `https` without TLS configuration.
    UnsupportedScheme,
    /// Request cannot be written on the wire, or pool configuration is invalid.
    InvalidRequest,
    /// Message body is iterated more than once.
    StreamConsumed,
    /// Pool is closed.
    PoolClosed,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self { inner: Box::new(Inner { kind, detail: Detail::None }) }
    }

    pub(crate) fn with_message(kind: ErrorKind, message: &'static str) -> Self {
        Self { inner: Box::new(Inner { kind, detail: Detail::Message(message) }) }
    }

    pub(crate) fn with_source(kind: ErrorKind, source: impl Into<BoxError>) -> Self {
        Self { inner: Box::new(Inner { kind, detail: Detail::Source(source.into()) }) }
    }

    #[inline]
    pub(crate) fn invalid_request(message: &'static str) -> Self {
        Self::with_message(ErrorKind::InvalidRequest, message)
    }

    /// Invalid pool configuration.
    #[inline]
    pub(crate) fn config(message: &'static str) -> Self {
        Self::with_message(ErrorKind::InvalidRequest, message)
    }

    /// Map socket error into [`ErrorKind::ConnectionClosed`] when the peer is gone.
    pub(crate) fn io(err: io::Error) -> Self {
        use io::ErrorKind as Io;
        let kind = match err.kind() {
            Io::UnexpectedEof
            | Io::ConnectionReset
            | Io::ConnectionAborted
            | Io::BrokenPipe
            | Io::NotConnected => ErrorKind::ConnectionClosed,
            _ => ErrorKind::Io,
        };
        Self::with_source(kind, err)
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.inner.kind
    }

    /// Returns `true` for any of the connect, write, read or pool timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self.inner.kind,
            ErrorKind::ConnectTimeout
                | ErrorKind::WriteTimeout
                | ErrorKind::ReadTimeout
                | ErrorKind::PoolTimeout
        )
    }

    /// Returns `true` if the error occurs while establishing a connection.
    pub fn is_connect(&self) -> bool {
        matches!(
            self.inner.kind,
            ErrorKind::ConnectTimeout | ErrorKind::Connect | ErrorKind::Tls
        )
    }
}

impl ErrorKind {
    const fn message(&self) -> &'static str {
        match self {
            Self::ConnectTimeout => "connect timeout",
            Self::WriteTimeout => "write timeout",
            Self::ReadTimeout => "read timeout",
            Self::PoolTimeout => "pool acquire timeout",
            Self::ConnectionClosed => "connection closed",
            Self::Protocol => "protocol error",
            Self::Tls => "tls error",
            Self::Connect => "connect error",
            Self::Io => "io error",
            Self::InvalidUrl => "invalid url",
            Self::UnsupportedScheme => "unsupported scheme",
            Self::InvalidRequest => "invalid request",
            Self::StreamConsumed => "body stream already consumed",
            Self::PoolClosed => "pool closed",
        }
    }
}

impl From<ProtoError> for Error {
    #[inline]
    fn from(value: ProtoError) -> Self {
        Self::with_source(ErrorKind::Protocol, value)
    }
}

impl From<io::Error> for Error {
    #[inline]
    fn from(value: io::Error) -> Self {
        Self::io(value)
    }
}

impl From<InvalidUri> for Error {
    fn from(value: InvalidUri) -> Self {
        match value {
            InvalidUri::UnsupportedScheme => Self::with_source(ErrorKind::UnsupportedScheme, value),
            value => Self::with_source(ErrorKind::InvalidUrl, value),
        }
    }
}

impl From<UnknownMethod> for Error {
    #[inline]
    fn from(value: UnknownMethod) -> Self {
        Self::with_source(ErrorKind::InvalidRequest, value)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.inner.detail {
            Detail::Source(source) => Some(source.as_ref()),
            Detail::None | Detail::Message(_) => None,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.inner.kind.message())?;
        match &self.inner.detail {
            Detail::None => Ok(()),
            Detail::Message(msg) => write!(f, ": {msg}"),
            Detail::Source(source) => write!(f, ": {source}"),
        }
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut f = f.debug_struct("Error");
        f.field("kind", &self.inner.kind);
        match &self.inner.detail {
            Detail::None => {}
            Detail::Message(msg) => {
                f.field("message", msg);
            }
            Detail::Source(source) => {
                f.field("source", source);
            }
        }
        f.finish()
    }
}
