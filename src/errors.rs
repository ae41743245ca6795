//! Error types for the object pool

use std::time::Duration;

use thiserror::Error;

/// Error produced by an [`ObjectFactory`](crate::ObjectFactory) when it
/// cannot create or decommission an object.
pub type FactoryError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Pool is at maximum capacity and does not block")]
    PoolExhausted,

    #[error("Timed out after {0:?} waiting for an object to become available")]
    Timeout(Duration),

    #[error("Pool has already been disposed")]
    Disposed,

    #[error("Object factory failed to create an object")]
    Factory(#[source] FactoryError),

    #[error("Pool is not configured to do trimming")]
    TrimmingDisabled,

    #[error("Checkout tracing is disabled for this pool")]
    TracingDisabled,

    #[error("Operation was cancelled")]
    Cancelled,
}

pub type PoolResult<T> = Result<T, PoolError>;
