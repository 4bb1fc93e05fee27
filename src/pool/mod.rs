//! HTTP/1.1 Connection Pool.
//!
//! [`ConnectionPool`] keeps connections per [`Origin`] and runs one transaction per connection
//! at a time.
//!
//! - at most [`Limits::max_connections`] connections exist across all origins
//! - at most [`Limits::max_keepalive_connections`] connections are idle, the oldest idle
//!   connection is closed first
//! - an idle connection older than [`Limits::keepalive_expiry`] is never reused
//! - the most recently idle connection of an origin is reused first
//! - when the pool is full, acquisitions wait in FIFO order until a connection is released or
//!   the pool timeout elapses
//!
//! [`Origin`]: crate::http::Origin
use std::sync::Arc;

use crate::body::Incoming;
use crate::conn::Connection;
use crate::error::{Error, ErrorKind};
use crate::http::Origin;
use crate::log::{debug, info, trace};
use crate::proto::RequestHead;
use crate::request::Request;
use crate::response::Response;

mod config;
mod state;

pub use config::{Limits, PoolConfig, Timeouts};
pub(crate) use state::Lease;
use state::{Grant, Shared};


/// HTTP/1.1 connection pool.
///
/// The pool is an explicit object owned by its caller. Dropping the pool, or calling
/// [`ConnectionPool::close`], closes every idle connection, fails pending acquisitions, and
/// aborts in flight transactions.
///
/// To share the pool between tasks, wrap it in an [`Arc`].
#[derive(Debug)]
pub struct ConnectionPool {
    shared: Arc<Shared>,
}

/// Snapshot of pool bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Total connections, idle, checked out and connecting included.
    pub connections: usize,
    /// Idle connections.
    pub idle: usize,
    /// Connections checked out or connecting.
    pub in_flight: usize,
    /// Acquisitions waiting for capacity.
    pub waiting: usize,
}

impl ConnectionPool {
    /// Create new [`ConnectionPool`].
    ///
    /// Returns error if `max_connections` is zero.
    pub fn new(config: PoolConfig) -> Result<Self, Error> {
        let limits = config.limits.validate()?;
        info!(
            "pool created, max connections: {}, max keep-alive: {}",
            limits.max_connections, limits.max_keepalive_connections
        );
        Ok(Self { shared: Arc::new(Shared::new(config, limits)) })
    }

    /// Send a request and wait for the response.
    ///
    /// Unless [`Request::stream`] is set, the whole response body is read before returning
    /// and the connection is released to the pool. With streaming, the connection is held by
    /// the response body until it is read to completion, or closed if the body is dropped
    /// before that.
    ///
    /// Any network or protocol error closes the connection used by the request.
    pub async fn request(&self, request: Request) -> Result<Response, Error> {
        let (method, url, headers, body, stream) = request.into_parts();

        if body.is_consumed() {
            return Err(Error::new(ErrorKind::StreamConsumed));
        }

        let origin = url.origin();
        if origin.is_tls() && self.shared.tls.is_none() {
            return Err(Error::with_message(
                ErrorKind::UnsupportedScheme,
                "https requires tls configuration",
            ));
        }

        let mut lease = self.acquire(origin).await?;

        trace!("[{}] {method} {url}", lease.conn().id());

        let head = RequestHead {
            method: &method,
            url: &url,
            headers: &headers,
            body_len: body.len(),
        };

        // on error the lease is dropped, closing the connection
        let (head, decoder) = lease.conn().send(head, body).await?;

        let mut response = Response::new(head, Incoming::streaming(lease, decoder));
        if !stream {
            response.buffer().await?;
        }
        Ok(response)
    }

    /// Acquire a connection to `origin`, waiting for capacity if the pool is full.
    async fn acquire(&self, origin: &Origin) -> Result<Lease, Error> {
        let Some(mut rx) = self.shared.enqueue(origin.clone()) else {
            return Err(Error::new(ErrorKind::PoolClosed));
        };

        let grant = match self.shared.timeouts.pool {
            Some(duration) => match tokio::time::timeout(duration, &mut rx).await {
                Ok(grant) => grant,
                Err(_elapsed) => {
                    // a grant may be sent right at the deadline
                    rx.close();
                    match rx.try_recv() {
                        Ok(grant) => Ok(grant),
                        Err(_) => {
                            debug!("pool acquire timeout for {origin}");
                            return Err(Error::new(ErrorKind::PoolTimeout));
                        }
                    }
                }
            },
            None => (&mut rx).await,
        };

        match grant {
            Ok(Grant::Reuse(lease)) => Ok(lease),
            Ok(Grant::Connect(slot)) => {
                let conn = Connection::connect(
                    self.shared.next_id(),
                    origin.clone(),
                    self.shared.tls.as_ref(),
                    self.shared.timeouts,
                    self.shared.subscribe(),
                )
                .await?;
                Ok(Lease::new(conn, slot))
            }
            // sender dropped by a closed pool
            Err(_closed) => Err(Error::new(ErrorKind::PoolClosed)),
        }
    }

    /// Returns a snapshot of the pool bookkeeping.
    pub fn stats(&self) -> PoolStats {
        self.shared.stats()
    }

    /// Returns `true` if the pool is closed.
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Close the pool.
    ///
    /// Idle connections are closed, pending acquisitions fail with [`ErrorKind::PoolClosed`],
    /// and in flight transactions fail at their next socket operation. Connections still held
    /// by response bodies are closed when released.
    pub fn close(&self) {
        self.shared.close();
    }
}

impl Drop for ConnectionPool {
    fn drop(&mut self) {
        self.shared.close();
    }
}
