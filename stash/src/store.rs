//! # Store Facade
//!
//! Purpose: Expose a compact, blocking API over a Redis-compatible service,
//! organised as buckets (hashes) holding key/value fields.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `Store` hides pooling and protocol details.
//! 2. **Scoped Acquisition**: Each call holds one connection for exactly one
//!    command; the guard returns it on every exit path.
//! 3. **Single Command Path**: Typed operations all go through `run`.
//! 4. **Fail Fast**: Errors are surfaced as-is, never retried.

use serde::Deserialize;

use crate::error::{StashError, StashResult};
use crate::pool::{ConnectionPool, Dialer, PoolConfig, PoolStatus};
use crate::reply::Reply;

/// Acknowledgment expected from a health check.
const PONG: &str = "PONG";

/// Configuration for the store and its pool.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Server address, e.g. "127.0.0.1:6379" or "redis://127.0.0.1:6379/0".
    pub addr: String,
    /// Pool sizing and wait policy.
    pub pool: PoolConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            addr: "127.0.0.1:6379".to_string(),
            pool: PoolConfig::default(),
        }
    }
}

/// Pooled bucket/key store.
///
/// Cheap to clone; clones share one pool, which is closed once the last
/// clone is dropped.
#[derive(Debug, Clone)]
pub struct Store {
    pool: ConnectionPool,
}

impl Store {
    /// Connects to `host` with the default pool configuration.
    pub fn connect(host: impl Into<String>) -> StashResult<Self> {
        let config = StoreConfig {
            addr: host.into(),
            ..StoreConfig::default()
        };
        Self::with_config(config)
    }

    /// Connects with a custom configuration.
    pub fn with_config(config: StoreConfig) -> StashResult<Self> {
        let dialer = Dialer::new(&config.addr)?;
        let pool = ConnectionPool::new(dialer, config.pool)?;
        let store = Self::with_pool(pool)?;
        tracing::info!(addr = %config.addr, "stash store connected");
        Ok(store)
    }

    /// Wraps an existing pool after checking that it can reach the service.
    ///
    /// The check only requires `PING` to succeed; the reply text is checked
    /// by [`ping`](Self::ping).
    pub fn with_pool(pool: ConnectionPool) -> StashResult<Self> {
        let mut conn = pool.acquire().map_err(|err| {
            tracing::warn!(error = %err, "stash initial connection failed");
            StashError::Connection(err)
        })?;
        redis::cmd("PING")
            .query::<redis::Value>(&mut *conn)
            .map_err(|err| {
                tracing::warn!(error = %err, "stash initial ping failed");
                StashError::connection(err)
            })?;
        drop(conn);
        Ok(Store { pool })
    }

    /// Checks that the service answers `PING` with exactly `PONG`.
    pub fn ping(&self) -> StashResult<()> {
        match self.run("PING", &[]) {
            Ok(Reply::Status(text)) if text == PONG => Ok(()),
            Ok(reply) => {
                tracing::warn!(?reply, "stash ping returned unexpected reply");
                Err(StashError::Unreachable)
            }
            Err(err) => {
                tracing::warn!(error = %err, "stash ping failed");
                Err(StashError::Unreachable)
            }
        }
    }

    /// Fetches `key` from `bucket`.
    ///
    /// A missing bucket or key yields `Reply::Nil`, not an error.
    pub fn get(&self, bucket: &str, key: &str) -> StashResult<Reply> {
        self.run("HGET", &[bucket.as_bytes(), key.as_bytes()])
    }

    /// Stores `value` under `key` in `bucket`, creating or overwriting it.
    pub fn set(&self, bucket: &str, key: &str, value: &[u8]) -> StashResult<()> {
        self.run("HSET", &[bucket.as_bytes(), key.as_bytes(), value])?;
        Ok(())
    }

    /// Issues an arbitrary command verbatim and returns the raw reply.
    pub fn execute(&self, command: &str, args: &[&[u8]]) -> StashResult<Reply> {
        self.run(command, args)
    }

    /// Returns current pool usage.
    pub fn pool_status(&self) -> PoolStatus {
        self.pool.status()
    }

    fn run(&self, command: &str, args: &[&[u8]]) -> StashResult<Reply> {
        let mut cmd = redis::cmd(command);
        for arg in args {
            cmd.arg(*arg);
        }

        tracing::debug!(command, args = args.len(), "stash command");
        let mut conn = self.pool.acquire().map_err(StashError::Command)?;
        let value = cmd
            .query::<redis::Value>(&mut *conn)
            .map_err(StashError::command)?;
        Ok(Reply::from(value))
    }
}
