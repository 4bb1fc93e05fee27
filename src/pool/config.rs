use std::sync::Arc;
use std::time::Duration;
use tokio_rustls::rustls::ClientConfig;

use crate::error::Error;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection pool configuration.
///
/// ```
/// use std::time::Duration;
/// use h1pool::{Limits, PoolConfig, Timeouts};
///
/// let config = PoolConfig::default()
///     .with_timeout(Timeouts::all(Duration::from_secs(10)))
///     .with_limits(Limits {
///         max_connections: 10,
///         ..Limits::default()
///     });
/// assert_eq!(config.limits.max_keepalive_connections, 20);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PoolConfig {
    /// TLS client configuration, `None` means only `http` origins are supported.
    pub tls: Option<Arc<ClientConfig>>,
    pub timeout: Timeouts,
    pub limits: Limits,
}

impl PoolConfig {
    #[inline]
    pub fn with_tls(mut self, tls: Arc<ClientConfig>) -> Self {
        self.tls = Some(tls);
        self
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Timeouts) -> Self {
        self.timeout = timeout;
        self
    }

    #[inline]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}

// ===== Timeouts =====

/// Per operation timeouts, `None` means unbounded.
///
/// Each timeout applies to a single operation and aborts only that operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// TCP connect and TLS handshake.
    pub connect: Option<Duration>,
    /// Each socket write.
    pub write: Option<Duration>,
    /// Each socket read.
    pub read: Option<Duration>,
    /// Waiting for a pool slot.
    pub pool: Option<Duration>,
}

impl Timeouts {
    /// All operations are unbounded.
    pub const fn none() -> Self {
        Self { connect: None, write: None, read: None, pool: None }
    }

    /// Set every timeout to `duration`.
    pub const fn all(duration: Duration) -> Self {
        Self {
            connect: Some(duration),
            write: Some(duration),
            read: Some(duration),
            pool: Some(duration),
        }
    }

    #[inline]
    pub const fn with_connect(mut self, connect: Option<Duration>) -> Self {
        self.connect = connect;
        self
    }

    #[inline]
    pub const fn with_write(mut self, write: Option<Duration>) -> Self {
        self.write = write;
        self
    }

    #[inline]
    pub const fn with_read(mut self, read: Option<Duration>) -> Self {
        self.read = read;
        self
    }

    #[inline]
    pub const fn with_pool(mut self, pool: Option<Duration>) -> Self {
        self.pool = pool;
        self
    }
}

impl Default for Timeouts {
    #[inline]
    fn default() -> Self {
        Self::all(DEFAULT_TIMEOUT)
    }
}

// ===== Limits =====

/// Connection count limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum number of connections across all origins, idle included.
    pub max_connections: usize,
    /// Maximum number of idle connections, excess is closed on release.
    pub max_keepalive_connections: usize,
    /// Idle connections older than this are closed, `None` means never expire.
    pub keepalive_expiry: Option<Duration>,
}

impl Limits {
    /// Check the limits, `max_keepalive_connections` is clamped to `max_connections`.
    pub(crate) fn validate(self) -> Result<Self, Error> {
        if self.max_connections == 0 {
            return Err(Error::config("max_connections must be greater than zero"));
        }
        Ok(Self {
            max_keepalive_connections: self.max_keepalive_connections.min(self.max_connections),
            ..self
        })
    }
}

impl Default for Limits {
    #[inline]
    fn default() -> Self {
        Self {
            max_connections: 100,
            max_keepalive_connections: 20,
            keepalive_expiry: Some(DEFAULT_TIMEOUT),
        }
    }
}
