//! # Error Taxonomy
//!
//! Errors are surfaced to the caller immediately. The facade never retries
//! and never classifies failures as transient or permanent.

use thiserror::Error;

/// Result type for stash operations.
pub type StashResult<T> = Result<T, StashError>;

/// Failure reported by one of the delegated backends (transport or pool).
#[derive(Debug, Error)]
pub enum BackendError {
    /// Dial, IO, protocol, or server-side error reply.
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
    /// The pool could not hand out a connection in time.
    #[error(transparent)]
    Pool(#[from] r2d2::Error),
    /// Every connection is in use and the pool is configured not to wait.
    #[error("connection pool exhausted")]
    Exhausted,
}

/// Errors surfaced by the store facade.
#[derive(Debug, Error)]
pub enum StashError {
    /// Store construction could not reach the service.
    #[error("stash: connection failed: {0}")]
    Connection(#[source] BackendError),
    /// Health check failed or returned an unexpected acknowledgment.
    #[error("stash: service unreachable")]
    Unreachable,
    /// A command could not be executed.
    #[error("stash: command failed: {0}")]
    Command(#[source] BackendError),
    /// Configuration was rejected before any connection was made.
    #[error("stash: invalid config: {0}")]
    Config(String),
    /// A key segment contains the `:` delimiter.
    #[error("stash: invalid key segment {0:?}")]
    InvalidKey(String),
}

impl StashError {
    pub(crate) fn command(err: impl Into<BackendError>) -> Self {
        StashError::Command(err.into())
    }

    pub(crate) fn connection(err: impl Into<BackendError>) -> Self {
        StashError::Connection(err.into())
    }
}
