use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;

use crate::error::{Error, ErrorKind};
use crate::http::{Origin, Scheme};

/// Plaintext or TLS socket to a single origin.
#[derive(Debug)]
pub enum Stream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl Stream {
    /// Open TCP connection, then perform TLS handshake for `https` origin.
    pub async fn connect(origin: &Origin, tls: Option<&TlsConnector>) -> Result<Stream, Error> {
        let connector = match (origin.scheme(), tls) {
            (Scheme::Http, _) => None,
            (Scheme::Https, Some(connector)) => Some(connector),
            (Scheme::Https, None) => {
                return Err(Error::with_message(
                    ErrorKind::UnsupportedScheme,
                    "https requires tls configuration",
                ));
            }
        };

        let tcp = TcpStream::connect((origin.host(), origin.port()))
            .await
            .map_err(|err| Error::with_source(ErrorKind::Connect, err))?;

        // requests are written as a whole, no need to wait for more bytes
        let _ = tcp.set_nodelay(true);

        let Some(connector) = connector else {
            return Ok(Stream::Plain(tcp));
        };

        let name = ServerName::try_from(origin.host().to_owned())
            .map_err(|err| Error::with_source(ErrorKind::Tls, err))?;
        let tls = connector
            .connect(name, tcp)
            .await
            .map_err(|err| Error::with_source(ErrorKind::Tls, err))?;
        Ok(Stream::Tls(Box::new(tls)))
    }

    #[inline]
    pub fn is_tls(&self) -> bool {
        matches!(self, Stream::Tls(_))
    }

    /// Non blocking readiness probe of an idle socket.
    ///
    /// Returns `false` if the peer closed the connection, sent unsolicited bytes, or the socket
    /// errored. The probe never waits.
    pub fn is_open(&mut self) -> bool {
        let mut cx = Context::from_waker(Waker::noop());
        let mut byte = [0u8; 1];
        let mut buf = ReadBuf::new(&mut byte);
        match Pin::new(self).poll_read(&mut cx, &mut buf) {
            Poll::Pending => true,
            Poll::Ready(Ok(())) | Poll::Ready(Err(_)) => false,
        }
    }
}

impl AsyncRead for Stream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(io) => Pin::new(io).poll_read(cx, buf),
            Stream::Tls(io) => Pin::new(io.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Stream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Stream::Plain(io) => Pin::new(io).poll_write(cx, buf),
            Stream::Tls(io) => Pin::new(io.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Stream::Plain(io) => Pin::new(io).poll_write_vectored(cx, bufs),
            Stream::Tls(io) => Pin::new(io.as_mut()).poll_write_vectored(cx, bufs),
        }
    }

    fn is_write_vectored(&self) -> bool {
        match self {
            Stream::Plain(io) => io.is_write_vectored(),
            Stream::Tls(io) => io.is_write_vectored(),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(io) => Pin::new(io).poll_flush(cx),
            Stream::Tls(io) => Pin::new(io.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(io) => Pin::new(io).poll_shutdown(cx),
            Stream::Tls(io) => Pin::new(io.as_mut()).poll_shutdown(cx),
        }
    }
}
