//! The factory contract: how pooled objects are created, recycled and torn down

use crate::errors::FactoryError;

/// Lifecycle hooks for objects managed by a [`KeyedPool`](crate::KeyedPool).
///
/// The pool never invokes any of these methods while holding an internal
/// lock, so implementations are free to perform I/O or take their own locks.
///
/// Only [`make`](Self::make) is required; the remaining hooks default to
/// no-ops that accept every object.
pub trait KeyedPoolFactory<K, T>: Send + Sync {
    /// Create a new instance for `key`.
    fn make(&self, key: &K) -> Result<T, FactoryError>;

    /// Prepare an instance that is about to be handed to a borrower.
    ///
    /// Failure destroys the instance. If the instance was created for this
    /// borrow, the failure surfaces to the caller; otherwise the borrow
    /// silently retries with another instance.
    fn activate(&self, _key: &K, _obj: &mut T) -> Result<(), FactoryError> {
        Ok(())
    }

    /// Reset an instance that is being returned to the idle pool.
    ///
    /// Failure destroys the instance; the error is recorded in the pool's
    /// swallowed-error history.
    fn passivate(&self, _key: &K, _obj: &mut T) -> Result<(), FactoryError> {
        Ok(())
    }

    /// Side-effect-free health check. Returning `false` destroys the
    /// instance.
    fn validate(&self, _key: &K, _obj: &T) -> bool {
        true
    }

    /// Release external resources held by an instance leaving the pool.
    ///
    /// Errors are recorded in the swallowed-error history, never surfaced.
    fn destroy(&self, _key: &K, _obj: T) -> Result<(), FactoryError> {
        Ok(())
    }
}
