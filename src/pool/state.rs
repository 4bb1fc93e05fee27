use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio_rustls::TlsConnector;

use super::{Limits, PoolConfig, PoolStats, Timeouts};
use crate::conn::Connection;
use crate::http::Origin;
use crate::log::{debug, trace};

/// State shared between the pool handle and every checked out connection.
pub(crate) struct Shared {
    pub(crate) limits: Limits,
    pub(crate) timeouts: Timeouts,
    pub(crate) tls: Option<TlsConnector>,
    state: Mutex<State>,
    shutdown: watch::Sender<bool>,
    next_id: AtomicU64,
}

/// Bookkeeping, the lock is only held across non suspending steps.
#[derive(Debug, Default)]
struct State {
    /// Total connections, idle, checked out and connecting included.
    connections: usize,
    /// Idle connections of every origin, oldest first.
    idle: VecDeque<Connection>,
    /// Suspended acquisitions in FIFO order.
    waiters: VecDeque<Waiter>,
    closed: bool,
}

#[derive(Debug)]
struct Waiter {
    origin: Origin,
    tx: oneshot::Sender<Grant>,
}

/// Result of a pool acquisition.
#[derive(Debug)]
pub(crate) enum Grant {
    /// An idle connection of the requested origin.
    Reuse(Lease),
    /// Capacity for a new connection.
    Connect(Slot),
}

impl Shared {
    pub(crate) fn new(config: PoolConfig, limits: Limits) -> Self {
        Self {
            limits,
            timeouts: config.timeout,
            tls: config.tls.map(TlsConnector::from),
            state: Mutex::new(State::default()),
            shutdown: watch::channel(false).0,
            next_id: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Enqueue an acquisition for `origin`, the returned receiver resolves in FIFO order.
    ///
    /// Returns `None` if the pool is closed.
    pub(crate) fn enqueue(self: &Arc<Self>, origin: Origin) -> Option<oneshot::Receiver<Grant>> {
        let mut state = self.lock();
        if state.closed {
            return None;
        }
        let (tx, rx) = oneshot::channel();
        state.waiters.push_back(Waiter { origin, tx });
        self.dispatch(&mut state);
        Some(rx)
    }

    /// Serve waiters in FIFO order until the front waiter cannot be served.
    fn dispatch(self: &Arc<Self>, state: &mut State) {
        state.purge_expired(self.limits.keepalive_expiry);

        while let Some(waiter) = state.waiters.pop_front() {
            if waiter.tx.is_closed() {
                // cancelled while waiting
                continue;
            }

            let grant = if let Some(conn) = state.take_idle(&waiter.origin) {
                trace!("[{}] reuse idle connection to {}", conn.id(), conn.origin());
                Grant::Reuse(Lease::new(conn, Slot::new(self.clone())))
            } else if state.connections < self.limits.max_connections {
                state.connections += 1;
                Grant::Connect(Slot::new(self.clone()))
            } else if let Some(_conn) = state.idle.pop_front() {
                // all capacity is parked idle on other origins, the slot is handed over
                debug!("[{}] close idle connection to {} for {}", _conn.id(), _conn.origin(), waiter.origin);
                Grant::Connect(Slot::new(self.clone()))
            } else {
                state.waiters.push_front(waiter);
                trace!("pool full, {} waiting", state.waiters.len());
                break;
            };

            if let Err(grant) = waiter.tx.send(grant) {
                state.undo(grant);
            }
        }
    }

    /// Return a connection to the pool or free its slot.
    ///
    /// `conn` is returned to the idle set only if its last transaction completed cleanly.
    pub(crate) fn release(self: &Arc<Self>, conn: Option<Connection>) {
        let mut state = self.lock();
        match conn {
            Some(conn) if conn.is_idle() && !state.closed && self.limits.max_keepalive_connections > 0 => {
                trace!("[{}] connection to {} idle", conn.id(), conn.origin());
                state.idle.push_back(conn);
                while state.idle.len() > self.limits.max_keepalive_connections {
                    if let Some(_conn) = state.idle.pop_front() {
                        trace!("[{}] evict idle connection to {}", _conn.id(), _conn.origin());
                        state.connections -= 1;
                    }
                }
            }
            other => {
                if let Some(_conn) = &other {
                    trace!("[{}] close connection to {}", _conn.id(), _conn.origin());
                }
                state.connections -= 1;
                drop(other);
            }
        }
        self.dispatch(&mut state);
    }

    pub(crate) fn stats(&self) -> PoolStats {
        let state = self.lock();
        PoolStats {
            connections: state.connections,
            idle: state.idle.len(),
            in_flight: state.connections - state.idle.len(),
            waiting: state.waiters.iter().filter(|e| !e.tx.is_closed()).count(),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Close idle connections, fail waiters, and signal in flight connections.
    pub(crate) fn close(&self) {
        let (idle, waiters) = {
            let mut state = self.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            let idle = std::mem::take(&mut state.idle);
            state.connections -= idle.len();
            (idle, std::mem::take(&mut state.waiters))
        };

        debug!("pool closed, {} idle connections, {} waiters", idle.len(), waiters.len());

        // dropped waiter senders resolve as closed pool
        drop(waiters);
        drop(idle);
        self.shutdown.send_replace(true);
    }
}

impl std::fmt::Debug for Shared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared")
            .field("limits", &self.limits)
            .field("timeouts", &self.timeouts)
            .field("tls", &self.tls.is_some())
            .finish_non_exhaustive()
    }
}

impl State {
    /// Take the most recently idle connection of `origin` that is still open.
    fn take_idle(&mut self, origin: &Origin) -> Option<Connection> {
        while let Some(index) = self.idle.iter().rposition(|e| e.origin() == origin) {
            let mut conn = self.idle.remove(index)?;
            if conn.is_reusable() {
                return Some(conn);
            }
            self.connections -= 1;
        }
        None
    }

    fn purge_expired(&mut self, expiry: Option<Duration>) {
        let Some(expiry) = expiry else {
            return;
        };
        let before = self.idle.len();
        self.idle.retain(|conn| conn.idle_since().elapsed() < expiry);
        let _expired = before - self.idle.len();
        if _expired != 0 {
            trace!("{_expired} idle connections expired");
        }
        self.connections -= before - self.idle.len();
    }

    /// Revert a grant whose waiter is gone.
    fn undo(&mut self, grant: Grant) {
        match grant {
            Grant::Reuse(mut lease) => {
                lease.slot.disarm();
                if let Some(conn) = lease.conn.take() {
                    self.idle.push_back(conn);
                }
            }
            Grant::Connect(mut slot) => {
                slot.disarm();
                self.connections -= 1;
            }
        }
    }
}

// ===== Slot =====

/// One unit of pool capacity.
///
/// Dropping an armed slot frees the capacity and serves the next waiter. A slot must never be
/// dropped armed while the state lock is held.
#[derive(Debug)]
pub(crate) struct Slot {
    shared: Arc<Shared>,
    armed: bool,
}

impl Slot {
    fn new(shared: Arc<Shared>) -> Self {
        Self { shared, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        if self.armed {
            self.shared.release(None);
        }
    }
}

// ===== Lease =====

/// A checked out connection.
///
/// The connection is returned to the pool by [`Lease::release`]. Dropping the lease in the
/// middle of a transaction closes the connection, dropping it between transactions returns the
/// connection as idle.
#[derive(Debug)]
pub(crate) struct Lease {
    conn: Option<Connection>,
    slot: Slot,
}

impl Lease {
    pub(crate) fn new(conn: Connection, slot: Slot) -> Self {
        Self { conn: Some(conn), slot }
    }

    pub(crate) fn conn(&mut self) -> &mut Connection {
        match &mut self.conn {
            Some(conn) => conn,
            None => unreachable!("connection is only taken on release"),
        }
    }

    /// Return the connection to the pool, it is closed unless its last transaction completed
    /// cleanly.
    pub(crate) fn release(mut self) {
        self.slot.disarm();
        let conn = self.conn.take();
        self.slot.shared.release(conn);
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        match self.conn.take() {
            // no transaction started, e.g. a granted acquisition that was cancelled
            Some(conn) if conn.is_idle() => {
                self.slot.disarm();
                self.slot.shared.release(Some(conn));
            }
            Some(mut conn) => {
                // wire position is indeterminate
                trace!("[{}] abandoned connection to {} closed", conn.id(), conn.origin());
                conn.close();
                // the armed slot frees capacity
            }
            None => {}
        }
    }
}
