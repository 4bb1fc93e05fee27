//! In process HTTP/1.1 server replaying scripted responses.
use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use std::future::poll_fn;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

type Handler = Arc<dyn Fn(&[u8]) -> Reply + Send + Sync>;

/// Raw bytes written back for one request.
pub struct Reply {
    bytes: Bytes,
    delay: Option<Duration>,
    close: bool,
}

impl Reply {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self { bytes: bytes.into(), delay: None, close: false }
    }

    /// Wait before writing the reply.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Close the socket after writing the reply.
    pub fn close(mut self) -> Self {
        self.close = true;
        self
    }
}

pub struct MockServer {
    addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Bytes>>>,
    task: JoinHandle<()>,
}

impl MockServer {
    /// Start a server that answers every request on every connection with `handler`.
    pub async fn start<F>(handler: F) -> MockServer
    where
        F: Fn(&[u8]) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Handler = Arc::new(handler);

        let task = tokio::spawn({
            let accepted = accepted.clone();
            let requests = requests.clone();
            async move {
                while let Ok((io, _)) = listener.accept().await {
                    accepted.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(serve(io, handler.clone(), requests.clone()));
                }
            }
        });

        MockServer { addr, accepted, requests, task }
    }

    /// Start a server that answers every request with `bytes`.
    pub async fn respond(bytes: &'static [u8]) -> MockServer {
        Self::start(move |_| Reply::new(bytes)).await
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Returns the number of accepted connections.
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Returns every raw request received so far, head and body.
    pub fn requests(&self) -> Vec<Bytes> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(mut io: TcpStream, handler: Handler, requests: Arc<Mutex<Vec<Bytes>>>) {
    let mut buf = BytesMut::new();
    while let Some(request) = read_request(&mut io, &mut buf).await {
        requests.lock().unwrap().push(request.clone());
        let reply = handler(&request);
        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }
        if io.write_all(&reply.bytes).await.is_err() || reply.close {
            return;
        }
    }
}

/// Read one request, the body is framed by `Content-Length` or ends with the last chunk.
async fn read_request(io: &mut TcpStream, buf: &mut BytesMut) -> Option<Bytes> {
    let head_end = loop {
        if let Some(n) = find(buf, b"\r\n\r\n") {
            break n + 4;
        }
        fill(io, buf).await?;
    };

    let head = std::str::from_utf8(&buf[..head_end]).ok()?.to_ascii_lowercase();
    let end = if head.contains("transfer-encoding: chunked") {
        loop {
            if let Some(n) = find(&buf[head_end..], b"0\r\n\r\n") {
                break head_end + n + 5;
            }
            fill(io, buf).await?;
        }
    } else {
        let len = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .map(|value| value.trim().parse::<usize>().unwrap())
            .unwrap_or(0);
        while buf.len() < head_end + len {
            fill(io, buf).await?;
        }
        head_end + len
    };

    Some(buf.split_to(end).freeze())
}

async fn fill(io: &mut TcpStream, buf: &mut BytesMut) -> Option<()> {
    match io.read_buf(buf).await {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(()),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

// ===== Stream =====

/// [`Stream`] over an iterator of chunks.
pub struct IterStream<I>(pub I);

impl<I> Stream for IterStream<I>
where
    I: Iterator<Item = io::Result<Bytes>> + Unpin,
{
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.0.next())
    }
}

/// Create a request body producer from chunks.
pub fn chunks(chunks: &[&'static str]) -> IterStream<std::vec::IntoIter<io::Result<Bytes>>> {
    let chunks: Vec<_> = chunks.iter().map(|e| Ok(Bytes::from_static(e.as_bytes()))).collect();
    IterStream(chunks.into_iter())
}

pub async fn next<S: Stream + Unpin>(stream: &mut S) -> Option<S::Item> {
    poll_fn(|cx| Pin::new(&mut *stream).poll_next(cx)).await
}
