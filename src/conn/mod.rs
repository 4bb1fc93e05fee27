//! Single origin HTTP/1.1 connection.
//!
//! A [`Connection`] runs one transaction at a time:
//!
//! ```not_rust
//! connect -> Idle -> SendingRequest -> AwaitingResponseHead -> StreamingBody -> Idle | Closed
//! ```
//!
//! Any error closes the connection, and a closed connection never transitions again.
use bytes::{Bytes, BytesMut};
use std::future::poll_fn;
use std::pin::Pin;
use std::task::Poll;
use std::time::Instant;
use futures_core::Stream as _;
use tokio::sync::watch;
use tokio_rustls::TlsConnector;

use crate::body::Body;
use crate::common::ParseResult;
use crate::error::{Error, ErrorKind};
use crate::http::Origin;
use crate::log::{debug, trace};
use crate::pool::Timeouts;
use crate::proto::{
    BodyDecoder, BodyEncoder, EncodedBuf, ProtoError, RequestHead, ResponseHead, ResponseParser,
    encode_head,
};

mod io;
mod stream;

use io::Io;
use stream::Stream;


/// Writes smaller than this are coalesced into a single socket write.
const WRITE_COALESCE: usize = 16 * 1024;

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Ready for a new transaction.
    Idle,
    SendingRequest,
    AwaitingResponseHead,
    StreamingBody,
    /// Terminal state.
    Closed,
}

/// Connection to a single origin.
#[derive(Debug)]
pub struct Connection {
    id: u64,
    origin: Origin,
    io: Io,
    read_buf: BytesMut,
    write_buf: BytesMut,
    state: State,
    keep_alive: bool,
    idle_since: Instant,
}

impl Connection {
    /// Open a new connection to `origin`.
    ///
    /// Fails with [`ErrorKind::ConnectTimeout`] if connecting and TLS handshake exceeds the
    /// connect timeout.
    pub async fn connect(
        id: u64,
        origin: Origin,
        tls: Option<&TlsConnector>,
        timeouts: Timeouts,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Connection, Error> {
        let stream = io::connect(&origin, tls, timeouts.connect, shutdown.clone()).await?;

        debug!("[{id}] connected to {origin}, tls: {}", stream.is_tls());

        Ok(Connection {
            id,
            origin,
            io: Io::new(stream, timeouts, shutdown),
            read_buf: BytesMut::new(),
            write_buf: BytesMut::new(),
            state: State::Idle,
            keep_alive: true,
            idle_since: Instant::now(),
        })
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    /// Returns the instant the connection last became idle.
    #[inline]
    pub fn idle_since(&self) -> Instant {
        self.idle_since
    }

    /// Returns `true` if the connection can be reused for a new transaction.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    /// Returns `true` if the connection is idle and the socket is still open.
    ///
    /// Unsolicited bytes from an idle peer also make the connection unusable.
    pub fn is_reusable(&mut self) -> bool {
        if !self.is_idle() {
            return false;
        }
        if !self.read_buf.is_empty() || !self.io.is_open() {
            trace!("[{}] idle connection closed by peer", self.id);
            self.state = State::Closed;
            return false;
        }
        true
    }

    /// Close the connection.
    pub fn close(&mut self) {
        self.state = State::Closed;
    }

    // ===== Transaction =====

    /// Send request and wait for the response head.
    ///
    /// Informational responses are skipped. Returns the final response head and its body
    /// decoder, the connection stays in [`State::StreamingBody`] until the body is read to
    /// completion with [`Connection::read_chunk`].
    pub async fn send(
        &mut self,
        head: RequestHead<'_>,
        body: Body,
    ) -> Result<(ResponseHead, BodyDecoder), Error> {
        if self.state != State::Idle {
            return Err(Error::with_message(
                ErrorKind::ConnectionClosed,
                "connection is not ready for a new request",
            ));
        }

        let close = head.headers.has_token("connection", b"close");

        match self.transact(head, body).await {
            Ok((head, decoder)) => {
                self.keep_alive = !close
                    && head.is_keep_alive()
                    && !decoder.is_close_delimited()
                    // protocol switched, no more HTTP/1.1 on this socket
                    && head.status != 101;
                if decoder.is_eof() {
                    self.finish();
                } else {
                    self.state = State::StreamingBody;
                }
                Ok((head, decoder))
            }
            Err(err) => {
                debug!("[{}] transaction failed: {err}", self.id);
                self.state = State::Closed;
                Err(err)
            }
        }
    }

    async fn transact(
        &mut self,
        head: RequestHead<'_>,
        body: Body,
    ) -> Result<(ResponseHead, BodyDecoder), Error> {
        let method = head.method;

        self.state = State::SendingRequest;
        self.write_buf.clear();
        let encoder = encode_head(head, &mut self.write_buf)?;
        self.write_body(encoder, body).await?;

        self.state = State::AwaitingResponseHead;
        let head = self.read_head().await?;
        let decoder = BodyDecoder::new(method, &head)?;

        trace!("[{}] response {} {}", self.id, head.status, head.version);

        Ok((head, decoder))
    }

    async fn write_body(&mut self, mut encoder: BodyEncoder, mut body: Body) -> Result<(), Error> {
        loop {
            let chunk = match poll_fn(|cx| Pin::new(&mut body).poll_next(cx)).await {
                Some(Ok(chunk)) => chunk,
                Some(Err(err)) => return Err(Error::with_source(ErrorKind::Io, err)),
                None => break,
            };

            let EncodedBuf { header, chunk, trail } = encoder.encode_chunk(chunk).map_err(body_error)?;
            if self.write_buf.len() + header.len() + chunk.len() + trail.len() <= WRITE_COALESCE {
                self.write_buf.extend_from_slice(&header);
                self.write_buf.extend_from_slice(&chunk);
                self.write_buf.extend_from_slice(trail);
            } else {
                self.flush_write_buf().await?;
                self.write_chunk(header, chunk).await?;
                self.write_buf.extend_from_slice(trail);
            }
        }

        let eof = encoder.encode_eof().map_err(body_error)?;
        self.write_buf.extend_from_slice(eof);
        self.flush_write_buf().await?;
        self.io.flush().await
    }

    async fn write_chunk(&mut self, header: Bytes, chunk: Bytes) -> Result<(), Error> {
        if !header.is_empty() {
            self.io.write_all(&header).await?;
        }
        self.io.write_all(&chunk).await
    }

    async fn flush_write_buf(&mut self) -> Result<(), Error> {
        if !self.write_buf.is_empty() {
            self.io.write_all(&self.write_buf).await?;
            self.write_buf.clear();
        }
        Ok(())
    }

    async fn read_head(&mut self) -> Result<ResponseHead, Error> {
        let mut parser = ResponseParser::new();
        loop {
            match parser.parse(&mut self.read_buf) {
                ParseResult::Ok(head) if head.is_informational() && head.status != 101 => {
                    trace!("[{}] skip informational response {}", self.id, head.status);
                }
                ParseResult::Ok(head) => return Ok(head),
                ParseResult::Err(err) => return Err(err.into()),
                ParseResult::Pending => {
                    if self.io.read_buf(&mut self.read_buf).await? == 0 {
                        return Err(Error::with_message(
                            ErrorKind::ConnectionClosed,
                            "connection closed before response head",
                        ));
                    }
                }
            }
        }
    }

    /// Read the next response body chunk.
    ///
    /// Returns `Ok(None)` when the body is complete, after which the connection is either
    /// [`State::Idle`] or [`State::Closed`].
    pub async fn read_chunk(&mut self, decoder: &mut BodyDecoder) -> Result<Option<Bytes>, Error> {
        if self.state != State::StreamingBody {
            return match decoder.is_eof() {
                true => Ok(None),
                false => Err(Error::with_message(ErrorKind::ConnectionClosed, "connection closed")),
            };
        }

        let result = self.poll_chunk(decoder).await;
        match &result {
            Ok(Some(_)) => {}
            Ok(None) => self.finish(),
            Err(_err) => {
                debug!("[{}] reading body failed: {_err}", self.id);
                self.state = State::Closed;
            }
        }
        result
    }

    async fn poll_chunk(&mut self, decoder: &mut BodyDecoder) -> Result<Option<Bytes>, Error> {
        loop {
            match decoder.decode_chunk(&mut self.read_buf) {
                Poll::Ready(Some(Ok(chunk))) => return Ok(Some(chunk.freeze())),
                Poll::Ready(Some(Err(err))) => return Err(err.into()),
                Poll::Ready(None) => return Ok(None),
                Poll::Pending => {
                    if self.io.read_buf(&mut self.read_buf).await? == 0 {
                        decoder.decode_eof().map_err(|err| {
                            Error::with_source(ErrorKind::ConnectionClosed, err)
                        })?;
                    }
                }
            }
        }
    }

    /// Transaction complete.
    fn finish(&mut self) {
        // leftover bytes means the peer sent more than the framing declared
        self.state = match self.keep_alive && self.read_buf.is_empty() {
            true => State::Idle,
            false => State::Closed,
        };
        self.idle_since = Instant::now();
    }
}

fn body_error(err: ProtoError) -> Error {
    Error::with_source(ErrorKind::InvalidRequest, err)
}
