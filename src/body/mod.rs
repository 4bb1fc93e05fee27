//! HTTP Message Body.
//!
//! - [`Body`] outgoing request body, in memory bytes or a caller supplied producer
//! - [`Incoming`] response body, streamed from the connection or buffered
//! - [`BodyStream`] [`Incoming`] as a [`Stream`]
//!
//! Both side are lazy and single consumption, once iteration begins the body cannot be
//! restarted.
//!
//! [`Stream`]: futures_core::Stream
mod incoming;
mod stream;

pub use incoming::Incoming;
pub use stream::BodyStream;

use bytes::Bytes;
use futures_core::Stream;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};


type BoxStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + 'static>>;

/// Outgoing request body.
///
/// A [`Body`] with known length is framed with `Content-Length`, otherwise it is sent with
/// chunked transfer coding.
pub struct Body {
    repr: Repr,
    started: bool,
}

enum Repr {
    Full(Bytes),
    Stream {
        stream: BoxStream,
        len: Option<u64>,
    },
}

// ===== Constructor =====

impl Body {
    /// Create an empty [`Body`].
    #[inline]
    pub const fn empty() -> Body {
        Self { repr: Repr::Full(Bytes::new()), started: false }
    }

    /// Create an exact size [`Body`] from in memory bytes.
    #[inline]
    pub fn full(bytes: impl Into<Bytes>) -> Body {
        Self { repr: Repr::Full(bytes.into()), started: false }
    }

    /// Create a [`Body`] from a producer with unknown length, sent with chunked transfer
    /// coding.
    pub fn from_stream<S>(stream: S) -> Body
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            repr: Repr::Stream { stream: Box::pin(stream), len: None },
            started: false,
        }
    }

    /// Create a [`Body`] from a producer that yields exactly `len` bytes.
    ///
    /// Producing more or less bytes fails the request and closes the connection.
    pub fn from_sized_stream<S>(len: u64, stream: S) -> Body
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            repr: Repr::Stream { stream: Box::pin(stream), len: Some(len) },
            started: false,
        }
    }
}

// ===== Ref =====

impl Body {
    /// Returns the total length of the body if known up front.
    #[inline]
    pub fn len(&self) -> Option<u64> {
        match &self.repr {
            Repr::Full(bytes) => Some(bytes.len() as u64),
            Repr::Stream { len, .. } => *len,
        }
    }

    /// Returns `true` if the body is known to be empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Returns `true` if iteration has begun.
    #[inline]
    pub fn is_consumed(&self) -> bool {
        self.started
    }
}

impl Stream for Body {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let me = self.get_mut();
        me.started = true;
        match &mut me.repr {
            Repr::Full(bytes) if bytes.is_empty() => Poll::Ready(None),
            Repr::Full(bytes) => Poll::Ready(Some(Ok(std::mem::take(bytes)))),
            Repr::Stream { stream, .. } => stream.as_mut().poll_next(cx),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.repr {
            Repr::Full(bytes) if bytes.is_empty() => (0, Some(0)),
            Repr::Full(_) => (1, Some(1)),
            Repr::Stream { stream, .. } => stream.size_hint(),
        }
    }
}

impl Default for Body {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut f = f.debug_struct("Body");
        match &self.repr {
            Repr::Full(bytes) => f.field("full", &bytes.len()),
            Repr::Stream { len, .. } => f.field("stream", len),
        };
        f.field("started", &self.started).finish()
    }
}

// ===== From =====

macro_rules! from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Body {
                #[inline]
                fn from(value: $ty) -> Self {
                    Self::full(value)
                }
            }
        )*
    };
}

from!(Bytes, Vec<u8>, String, &'static [u8], &'static str);
