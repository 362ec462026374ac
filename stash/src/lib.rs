//! # Stash
//!
//! Purpose: Provide a small, synchronous bucket/key facade over a
//! Redis-compatible service, with connection pooling to minimize TCP
//! handshake overhead.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Reuse connections through `r2d2`.
//! 2. **Thin Adapter**: The wire protocol is `redis`'s job; this crate only
//!    names things (buckets, keys) and scopes connection use.
//! 3. **Opaque Values**: Values go in as bytes and come back as [`Reply`].
//!
//! ```no_run
//! use stash::Store;
//!
//! let store = Store::connect("127.0.0.1:6379")?;
//! store.set("users", "42", b"alice")?;
//! let _name = store.get("users", "42")?;
//! # Ok::<(), stash::StashError>(())
//! ```

mod error;
mod keys;
mod pool;
mod reply;
mod store;

pub use error::{BackendError, StashError, StashResult};
pub use keys::{bucket_key, build_key, checked_build_key, BUCKET_PREFIX, DELIMITER};
pub use pool::{ConnectionPool, Dialer, PoolConfig, PoolStatus, PooledConnection};
pub use reply::Reply;
pub use store::{Store, StoreConfig};
