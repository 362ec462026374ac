//! # Connection Pool
//!
//! Purpose: Keep a bounded set of reusable connections to the store so that
//! each facade call only pays for one command round-trip.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Queuing, idle reaping and liveness checks are
//!    delegated to `r2d2`; this module only configures and wraps it.
//! 2. **RAII Release**: A `PooledConnection` goes back to the pool when it is
//!    dropped, on success and error paths alike.
//! 3. **Explicit Waiting**: Saturation either fails fast, waits with a bound,
//!    or waits indefinitely, as chosen by `PoolConfig`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use r2d2::{HandleError, ManageConnection};
use redis::ConnectionLike;
use serde::Deserialize;

use crate::error::{BackendError, StashError, StashResult};

/// Connection checked out of a [`ConnectionPool`].
pub type PooledConnection = r2d2::PooledConnection<Dialer>;

/// Pool configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Connections kept warm once the idle timeout has reaped the rest.
    pub max_idle: u32,
    /// Maximum total connections (idle + in-use).
    pub max_active: u32,
    /// Idle connections older than this are closed. `None` keeps them forever.
    pub idle_timeout: Option<Duration>,
    /// Block when every connection is in use instead of failing.
    pub wait: bool,
    /// Upper bound on a blocking acquire. `None` waits indefinitely.
    pub wait_timeout: Option<Duration>,
    /// How long a single acquire attempt waits for a dial to finish.
    pub connection_timeout: Duration,
    /// Issue `PING` on every borrow and discard connections that fail it.
    pub test_on_borrow: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            max_idle: 10,
            max_active: 50,
            idle_timeout: Some(Duration::from_secs(300)),
            wait: true,
            wait_timeout: None,
            connection_timeout: Duration::from_secs(5),
            test_on_borrow: true,
        }
    }
}

impl PoolConfig {
    /// Rejects values the pool cannot be built with.
    pub fn validate(&self) -> StashResult<()> {
        if self.max_active == 0 {
            return Err(StashError::Config("max_active must be positive".into()));
        }
        if self.idle_timeout == Some(Duration::ZERO) {
            return Err(StashError::Config("idle_timeout must be positive".into()));
        }
        if self.wait_timeout == Some(Duration::ZERO) {
            return Err(StashError::Config("wait_timeout must be positive".into()));
        }
        if self.connection_timeout.is_zero() {
            return Err(StashError::Config("connection_timeout must be positive".into()));
        }
        Ok(())
    }
}

/// Point-in-time view of pool usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Open connections, idle or checked out.
    pub connections: u32,
    /// Connections sitting idle in the pool.
    pub idle: u32,
    /// Connections currently checked out.
    pub in_use: u32,
}

/// Dials new connections for the pool and checks them on borrow.
#[derive(Debug, Clone)]
pub struct Dialer {
    client: redis::Client,
}

impl Dialer {
    /// Creates a dialer bound to `host`.
    ///
    /// Accepts `host:port` or a full `redis://` URL. Nothing is dialed yet.
    pub fn new(host: &str) -> StashResult<Self> {
        let client = redis::Client::open(connection_url(host)).map_err(StashError::connection)?;
        Ok(Dialer { client })
    }
}

impl ManageConnection for Dialer {
    type Connection = redis::Connection;
    type Error = redis::RedisError;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        self.client.get_connection()
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        // Only the command outcome matters here, not the acknowledgment text.
        redis::cmd("PING").query::<()>(conn)
    }

    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        !conn.is_open()
    }
}

fn connection_url(host: &str) -> String {
    if host.contains("://") {
        host.to_string()
    } else {
        format!("redis://{}/", host)
    }
}

/// Routes r2d2's dial and liveness errors into `tracing` and counts them.
///
/// The count lets a waiting acquire tell a backend failure apart from a
/// plain saturation timeout without re-reading pool state.
#[derive(Debug)]
struct TracingErrorHandler {
    errors: Arc<AtomicU64>,
}

impl<E: fmt::Display> HandleError<E> for TracingErrorHandler {
    fn handle_error(&self, error: E) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        tracing::warn!(error = %error, "stash pool backend error");
    }
}

/// Connection pool handle.
///
/// Cloning is cheap; clones share the same underlying pool.
#[derive(Debug, Clone)]
pub struct ConnectionPool {
    inner: r2d2::Pool<Dialer>,
    config: PoolConfig,
    backend_errors: Arc<AtomicU64>,
}

impl ConnectionPool {
    /// Creates a pool over `dialer`.
    ///
    /// No connection is awaited here; `max_idle` connections are dialed in
    /// the background and failures only surface on [`acquire`](Self::acquire).
    pub fn new(dialer: Dialer, config: PoolConfig) -> StashResult<Self> {
        config.validate()?;
        let backend_errors = Arc::new(AtomicU64::new(0));
        let inner = r2d2::Pool::builder()
            .max_size(config.max_active)
            .min_idle(Some(config.max_idle.min(config.max_active)))
            .idle_timeout(config.idle_timeout)
            .max_lifetime(None)
            .test_on_check_out(config.test_on_borrow)
            .connection_timeout(config.connection_timeout)
            .error_handler(Box::new(TracingErrorHandler {
                errors: backend_errors.clone(),
            }))
            .build_unchecked(dialer);
        Ok(ConnectionPool {
            inner,
            config,
            backend_errors,
        })
    }

    /// Acquires a connection, honoring the configured wait policy.
    pub fn acquire(&self) -> Result<PooledConnection, BackendError> {
        if !self.config.wait {
            if self.is_saturated() {
                return Err(BackendError::Exhausted);
            }
            return Ok(self.inner.get()?);
        }

        if let Some(timeout) = self.config.wait_timeout {
            return Ok(self.inner.get_timeout(timeout)?);
        }

        loop {
            let seen = self.backend_errors.load(Ordering::SeqCst);
            match self.inner.get() {
                Ok(conn) => return Ok(conn),
                // No dial or liveness error during this attempt: the timeout
                // came from saturation, so keep waiting for a release.
                Err(err) if self.backend_errors.load(Ordering::SeqCst) == seen => {
                    tracing::debug!(error = %err, "stash pool saturated, still waiting");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Returns current usage counters.
    pub fn status(&self) -> PoolStatus {
        let state = self.inner.state();
        PoolStatus {
            connections: state.connections,
            idle: state.idle_connections,
            in_use: state.connections.saturating_sub(state.idle_connections),
        }
    }

    /// Returns the configuration the pool was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    fn is_saturated(&self) -> bool {
        let state = self.inner.state();
        state.idle_connections == 0 && state.connections >= self.inner.max_size()
    }
}
