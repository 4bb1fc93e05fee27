use bytes::BytesMut;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::watch;
use tokio_rustls::TlsConnector;

use super::Stream;
use crate::error::{Error, ErrorKind};
use crate::http::Origin;
use crate::pool::Timeouts;

/// Initial read buffer capacity.
const READ_BUF_SIZE: usize = 8 * 1024;

/// Socket with per operation timeouts and pool shutdown signal.
///
/// Every suspension point races against the shutdown signal, resolving with
/// [`ErrorKind::PoolClosed`] once the pool is closed.
#[derive(Debug)]
pub struct Io {
    stream: Stream,
    timeouts: Timeouts,
    shutdown: watch::Receiver<bool>,
}

pub(super) async fn connect(
    origin: &Origin,
    tls: Option<&TlsConnector>,
    timeout: Option<Duration>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<Stream, Error> {
    timed(
        timeout,
        ErrorKind::ConnectTimeout,
        &mut shutdown,
        Stream::connect(origin, tls),
    )
    .await
}

impl Io {
    pub(super) fn new(stream: Stream, timeouts: Timeouts, shutdown: watch::Receiver<bool>) -> Self {
        Self { stream, timeouts, shutdown }
    }

    #[inline]
    pub(super) fn is_open(&mut self) -> bool {
        self.stream.is_open()
    }

    /// Read more bytes into `buf`, returns `0` on EOF.
    pub(super) async fn read_buf(&mut self, buf: &mut BytesMut) -> Result<usize, Error> {
        let Self { stream, timeouts, shutdown } = self;
        buf.reserve(READ_BUF_SIZE);
        timed(timeouts.read, ErrorKind::ReadTimeout, shutdown, async {
            stream.read_buf(buf).await.map_err(Error::io)
        })
        .await
    }

    pub(super) async fn write_all(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let Self { stream, timeouts, shutdown } = self;
        timed(timeouts.write, ErrorKind::WriteTimeout, shutdown, async {
            stream.write_all(bytes).await.map_err(Error::io)
        })
        .await
    }

    pub(super) async fn flush(&mut self) -> Result<(), Error> {
        let Self { stream, timeouts, shutdown } = self;
        timed(timeouts.write, ErrorKind::WriteTimeout, shutdown, async {
            stream.flush().await.map_err(Error::io)
        })
        .await
    }
}

/// Run `fut` with optional `timeout`, aborted when the pool is closed.
async fn timed<T, F>(
    timeout: Option<Duration>,
    kind: ErrorKind,
    shutdown: &mut watch::Receiver<bool>,
    fut: F,
) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    let io = async {
        match timeout {
            Some(duration) => match tokio::time::timeout(duration, fut).await {
                Ok(result) => result,
                Err(_elapsed) => Err(Error::new(kind)),
            },
            None => fut.await,
        }
    };

    tokio::select! {
        biased;
        _ = closed(shutdown) => Err(Error::new(ErrorKind::PoolClosed)),
        result = io => result,
    }
}

/// Resolves once the pool signals shutdown or is gone.
async fn closed(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|closed| *closed).await;
}
