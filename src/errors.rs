//! Error types for the keyed object pool

use thiserror::Error;

/// Boxed error returned by user-supplied factory methods.
pub type FactoryError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("pool has been closed")]
    Closed,

    #[error("timeout waiting for an idle object")]
    Exhausted,

    #[error("factory failed to create an object")]
    MakeFailed(#[source] FactoryError),

    #[error("unable to activate newly created object")]
    ActivationFailed(#[source] FactoryError),

    #[error("newly created object failed validation")]
    ValidationFailed,

    #[error("object is not currently part of this pool")]
    NotOwned,

    #[error("object has already been returned to this pool")]
    AlreadyReturned,
}

pub type PoolResult<T> = Result<T, PoolError>;
