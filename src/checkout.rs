//! Checkout tracing for leak diagnosis

use std::backtrace::Backtrace;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// One object currently lent out by a traced pool
#[derive(Debug, Clone)]
pub struct Checkout {
    /// Pool-unique object id
    pub id: usize,

    /// Name of the thread that acquired the object, if it has one
    pub thread: Option<String>,

    /// When the object was acquired
    pub acquired_at: Instant,

    /// Where the object was acquired
    pub backtrace: Arc<Backtrace>,
}

impl Checkout {
    fn capture(id: usize) -> Self {
        Self {
            id,
            thread: thread::current().name().map(str::to_string),
            acquired_at: Instant::now(),
            backtrace: Arc::new(Backtrace::force_capture()),
        }
    }

    /// How long the object has been out
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }
}

/// Snapshot of a traced pool
///
/// # Examples
///
/// ```
/// use limiting_pool::{PoolConfiguration, ResourceLimitingPool};
///
/// let pool = ResourceLimitingPool::from_fn(|| 0u8, PoolConfiguration::new().with_tracing(true));
///
/// let obj = pool.acquire().unwrap();
/// let state = pool.state().unwrap();
/// assert_eq!(state.size, 1);
/// assert_eq!(state.ready_size, 0);
/// assert_eq!(state.outstanding[0].id, obj.id());
/// ```
#[derive(Debug, Clone)]
pub struct PoolState {
    /// Live objects, lent out or idle
    pub size: usize,

    /// Idle objects
    pub ready_size: usize,

    /// Lent-out objects, oldest checkout first
    pub outstanding: Vec<Checkout>,
}

/// Internal tracker of lent-out objects
#[derive(Debug, Default)]
pub(crate) struct CheckoutTracker {
    outstanding: DashMap<usize, Checkout>,
}

impl CheckoutTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquired(&self, id: usize) {
        self.outstanding.insert(id, Checkout::capture(id));
    }

    /// Forget a checkout; returns false if the object was not tracked
    pub fn released(&self, id: usize) -> bool {
        self.outstanding.remove(&id).is_some()
    }

    pub fn snapshot(&self, size: usize, ready_size: usize) -> PoolState {
        let mut outstanding: Vec<Checkout> = self
            .outstanding
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        outstanding.sort_by_key(|checkout| checkout.acquired_at);

        PoolState {
            size,
            ready_size,
            outstanding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_records_thread_name() {
        let tracker = Arc::new(CheckoutTracker::new());

        let worker = Arc::clone(&tracker);
        thread::Builder::new()
            .name("pool-user".to_string())
            .spawn(move || worker.acquired(4))
            .unwrap()
            .join()
            .unwrap();

        let state = tracker.snapshot(1, 0);
        assert_eq!(state.outstanding.len(), 1);
        assert_eq!(state.outstanding[0].id, 4);
        assert_eq!(state.outstanding[0].thread.as_deref(), Some("pool-user"));
    }

    #[test]
    fn test_release_forgets_checkout() {
        let tracker = CheckoutTracker::new();
        tracker.acquired(1);
        tracker.acquired(2);

        assert!(tracker.released(1));
        assert!(!tracker.released(1));

        let ids: Vec<usize> = tracker.snapshot(2, 1).outstanding.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2]);
    }
}
