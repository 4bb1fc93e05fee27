use bytes::{Bytes, BytesMut};

use super::BodyStream;
use crate::error::Error;
use crate::headers::Headers;
use crate::pool::Lease;
use crate::proto::BodyDecoder;

/// Response message body.
///
/// While the body is streamed, [`Incoming`] holds the connection that produced it. Reading
/// the body to completion returns the connection to the pool, dropping it or calling
/// [`Incoming::discard`] before completion closes the connection, since its wire position is
/// indeterminate.
#[derive(Debug)]
pub struct Incoming {
    repr: Repr,
    trailers: Option<Headers>,
}

#[derive(Debug, Default)]
enum Repr {
    /// Buffered bytes not yet read.
    Bytes(Bytes),
    Streaming(Box<Streaming>),
    #[default]
    Done,
}

#[derive(Debug)]
struct Streaming {
    lease: Lease,
    decoder: BodyDecoder,
}

// ===== Constructor =====

impl Incoming {
    /// Create an exact size [`Incoming`].
    #[inline]
    pub fn new(bytes: impl Into<Bytes>) -> Incoming {
        Self {
            repr: Repr::Bytes(bytes.into()),
            trailers: Some(Headers::new()),
        }
    }

    /// Create an empty [`Incoming`].
    #[inline]
    pub const fn empty() -> Incoming {
        Self {
            repr: Repr::Done,
            trailers: Some(Headers::new()),
        }
    }

    /// Body read from `lease` framed by `decoder`.
    ///
    /// A body that is already complete releases the connection immediately.
    pub(crate) fn streaming(lease: Lease, decoder: BodyDecoder) -> Incoming {
        let mut me = Self {
            repr: Repr::Streaming(Box::new(Streaming { lease, decoder })),
            trailers: None,
        };
        if matches!(&me.repr, Repr::Streaming(streaming) if streaming.decoder.is_eof()) {
            me.complete();
        }
        me
    }
}

impl Default for Incoming {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

// ===== Ref =====

impl Incoming {
    /// Returns the bounds on the remaining length of the message body.
    pub fn size_hint(&self) -> (u64, Option<u64>) {
        match &self.repr {
            Repr::Bytes(b) => (b.len() as u64, Some(b.len() as u64)),
            Repr::Streaming(streaming) => {
                let hint = streaming.decoder.size_hint();
                (hint.unwrap_or(0), hint)
            }
            Repr::Done => (0, Some(0)),
        }
    }

    /// Returns `true` if there is no more bytes to read.
    pub fn is_end_stream(&self) -> bool {
        match &self.repr {
            Repr::Bytes(b) => b.is_empty(),
            Repr::Streaming(_) => false,
            Repr::Done => true,
        }
    }

    /// Returns `true` if the body is still read from a connection.
    #[inline]
    pub fn is_streaming(&self) -> bool {
        matches!(self.repr, Repr::Streaming(_))
    }

    /// Returns the trailer fields of a chunked body.
    ///
    /// Returns `None` until the body is completely read.
    #[inline]
    pub fn trailers(&self) -> Option<&Headers> {
        self.trailers.as_ref()
    }
}

// ===== Read =====

impl Incoming {
    /// Read the next chunk of the body.
    ///
    /// Returns `None` when the body is complete. After an error, the connection is closed and
    /// the body returns `None`.
    pub async fn read(&mut self) -> Option<Result<Bytes, Error>> {
        match &mut self.repr {
            Repr::Bytes(bytes) => {
                let bytes = std::mem::take(bytes);
                self.repr = Repr::Done;
                (!bytes.is_empty()).then_some(Ok(bytes))
            }
            Repr::Streaming(streaming) => {
                let Streaming { lease, decoder } = streaming.as_mut();
                let result = lease.conn().read_chunk(decoder).await;
                match result {
                    Ok(Some(chunk)) => Some(Ok(chunk)),
                    Ok(None) => {
                        self.complete();
                        None
                    }
                    Err(err) => {
                        // dropping the lease closes the connection
                        self.repr = Repr::Done;
                        Some(Err(err))
                    }
                }
            }
            Repr::Done => None,
        }
    }

    /// Read the rest of the body into a single [`Bytes`].
    pub async fn collect(mut self) -> Result<Bytes, Error> {
        self.buffer().await?;
        match std::mem::take(&mut self.repr) {
            Repr::Bytes(bytes) => Ok(bytes),
            _ => Ok(Bytes::new()),
        }
    }

    /// Read the rest of the body into memory, releasing the connection.
    pub(crate) async fn buffer(&mut self) -> Result<(), Error> {
        if !self.is_streaming() {
            return Ok(());
        }
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.read().await {
            buf.extend_from_slice(&chunk?);
        }
        self.repr = Repr::Bytes(buf.freeze());
        Ok(())
    }

    /// Discard the rest of the body without reading it.
    ///
    /// If the body is not yet complete, the connection is closed instead of returned to the
    /// pool.
    #[inline]
    pub fn discard(self) {
        drop(self);
    }

    /// Returns the body as a [`Stream`] of chunks.
    ///
    /// [`Stream`]: futures_core::Stream
    #[inline]
    pub fn into_stream(self) -> BodyStream {
        BodyStream::new(self)
    }

    fn complete(&mut self) {
        if let Repr::Streaming(streaming) = std::mem::take(&mut self.repr) {
            let Streaming { lease, mut decoder } = *streaming;
            self.trailers = Some(decoder.take_trailers());
            lease.release();
        }
    }
}
