//! # keyedpool
//!
//! A thread-safe object pool partitioned by key. Expensive-to-construct
//! objects (connections, sessions, parser contexts) are created by a
//! user-supplied factory, kept alive across uses, and handed out per key.
//!
//! ## Features
//!
//! - Independent sub-pool per key with per-key and global capacity caps
//! - Blocking borrows with FIFO fairness, timeouts, or fail-fast behaviour
//! - Automatic return of objects via RAII (Drop)
//! - Factory lifecycle hooks: make, activate, passivate, validate, destroy
//! - Validation on borrow, on return, and while idle
//! - Background eviction of stale idle objects with min-idle replenishment
//! - Cross-key capacity reuse so waiters never starve under a global cap
//! - Counter snapshots and a bounded history of swallowed errors
//!
//! ## Quick Start
//!
//! ```rust
//! use keyedpool::{FactoryError, KeyedPool, KeyedPoolFactory, PoolConfig};
//!
//! struct BufferFactory;
//!
//! impl KeyedPoolFactory<String, Vec<u8>> for BufferFactory {
//!     fn make(&self, key: &String) -> Result<Vec<u8>, FactoryError> {
//!         Ok(key.as_bytes().to_vec())
//!     }
//! }
//!
//! let pool: KeyedPool<String, Vec<u8>> = KeyedPool::new(BufferFactory, PoolConfig::default());
//! {
//!     let buf = pool.borrow(&"alpha".to_string()).unwrap();
//!     assert_eq!(buf.as_slice(), b"alpha");
//!     // Returned to the pool when `buf` goes out of scope.
//! }
//! assert_eq!(pool.num_idle(), 1);
//! ```

mod config;
mod deque;
mod errors;
mod eviction;
mod factory;
mod metrics;
mod object;
mod pool;
mod registry;

pub use config::{PoolConfig, TestsPerRun};
pub use errors::{FactoryError, PoolError, PoolResult};
pub use eviction::{EvictionContext, EvictionPolicyFn, default_eviction_policy};
pub use factory::KeyedPoolFactory;
pub use metrics::PoolMetrics;
pub use pool::{KeyedPool, Pooled};
