//! # Resource-limiting object pool
//!
//! Thread-safe object pool for Rust with soft and hard size limits, optional
//! blocking gets, automatic trimming of idle objects, and instrumentation.
//!
//! ## Features
//!
//! - Lazy creation through an [`ObjectFactory`], or a plain closure
//! - Automatic return of objects via RAII (Drop trait), most recent first
//! - Strict or lenient maximum size
//! - Blocking gets with an optional timeout when a strict pool is full
//! - Two-generation trimming: an object idle for two trim intervals is destroyed
//! - Recycle and validate hooks
//! - Counters and gauges, exportable as a map or in Prometheus format
//! - Optional `prometheus` registry sink
//! - Checkout tracing for leak hunting
//! - Async acquisition on tokio
//!
//! ## Quick Start
//!
//! ```rust
//! use limiting_pool::{PoolConfiguration, ResourceLimitingPool};
//! use std::time::Duration;
//!
//! let config = PoolConfiguration::new()
//!     .with_max_size(4)
//!     .with_max_strict(true)
//!     .with_blocking(true)
//!     .with_block_timeout(Duration::from_secs(1));
//!
//! let pool = ResourceLimitingPool::from_fn(|| Vec::<u8>::with_capacity(1024), config);
//! {
//!     let mut buffer = pool.acquire().unwrap();
//!     buffer.extend_from_slice(b"hello");
//!     // Object automatically returned when `buffer` goes out of scope
//! }
//! assert_eq!(pool.ready_size(), 1);
//! ```

mod checkout;
mod config;
mod errors;
mod factory;
mod generations;
mod metrics;
mod pool;
#[cfg(feature = "prometheus")]
mod prometheus_sink;

pub use checkout::{Checkout, PoolState};
pub use config::PoolConfiguration;
pub use errors::{FactoryError, PoolError, PoolResult};
pub use factory::{FnFactory, ObjectFactory};
pub use metrics::{Counter, Gauge, InstrumentSink, MetricsExporter, PoolMetrics};
pub use pool::{PooledObject, ResourceLimitingPool};
#[cfg(feature = "prometheus")]
pub use prometheus_sink::PrometheusSink;
