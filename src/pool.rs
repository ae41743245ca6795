//! Core resource-limiting pool implementation

use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, trace, warn};

use crate::checkout::{CheckoutTracker, PoolState};
use crate::config::PoolConfiguration;
use crate::errors::{PoolError, PoolResult};
use crate::factory::{FnFactory, ObjectFactory};
use crate::generations::{Generations, Slot, TrimSchedule};
use crate::metrics::{Counter, Gauge, InstrumentSink, Instruments, MetricsExporter, PoolMetrics};

/// A pooled object that automatically returns to the pool when dropped
pub struct PooledObject<F: ObjectFactory> {
    slot: Option<Slot<F::Object>>,
    pool: Arc<Shared<F>>,
}

impl<F: ObjectFactory> PooledObject<F> {
    /// Pool-unique id of this object
    pub fn id(&self) -> usize {
        self.slot.as_ref().map_or(0, |slot| slot.id)
    }

    /// Return the object to the pool. Same as dropping it.
    pub fn release(self) {
        drop(self);
    }

    /// Permanently remove a broken object instead of returning it.
    ///
    /// The factory decommissions the object and the freed capacity lets a
    /// blocked caller create a replacement.
    pub fn discard(mut self) {
        if let Some(slot) = self.slot.take() {
            self.pool.remove_permanently(slot);
        }
    }
}

impl<F: ObjectFactory> Deref for PooledObject<F> {
    type Target = F::Object;

    fn deref(&self) -> &Self::Target {
        &self.slot.as_ref().expect("Value already taken").value
    }
}

impl<F: ObjectFactory> DerefMut for PooledObject<F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.slot.as_mut().expect("Value already taken").value
    }
}

impl<F: ObjectFactory> Drop for PooledObject<F> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            self.pool.put(slot);
        }
    }
}

impl<F> fmt::Debug for PooledObject<F>
where
    F: ObjectFactory,
    F::Object: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledObject")
            .field("id", &self.id())
            .field("value", &self.slot.as_ref().map(|slot| &slot.value))
            .finish()
    }
}

/// Everything guarded by the pool lock
struct Ledger<T> {
    generations: Generations<T>,
    schedule: TrimSchedule,
    /// Live objects: lent out, idle, or being created
    size: usize,
    next_id: usize,
    disposed: bool,
}

struct Shared<F: ObjectFactory> {
    factory: F,
    config: PoolConfiguration,
    ledger: Mutex<Ledger<F::Object>>,
    available: Condvar,
    instruments: Instruments,
    checkouts: Option<CheckoutTracker>,
}

impl<F: ObjectFactory> Shared<F> {
    fn name(&self) -> &str {
        &self.config.name
    }

    /// With `wait` false a full strict pool fails at once even when blocking.
    fn acquire(self: &Arc<Self>, wait: bool) -> PoolResult<PooledObject<F>> {
        loop {
            self.trim_if_due();

            let (mut slot, fresh) = self.checkout(wait)?;
            if !fresh && !self.factory.validate(&mut slot.value) {
                debug!(pool = %self.name(), id = slot.id, "Removing object that failed validation");
                self.remove_permanently(slot);
                continue;
            }

            if let Some(tracker) = &self.checkouts {
                tracker.acquired(slot.id);
            }
            self.instruments.increment(Counter::Gets);
            trace!(pool = %self.name(), id = slot.id, "Got object from the pool");

            return Ok(PooledObject {
                slot: Some(slot),
                pool: Arc::clone(self),
            });
        }
    }

    /// Take an idle object, create one, or wait for one.
    ///
    /// The flag is true for freshly created objects.
    fn checkout(&self, wait: bool) -> PoolResult<(Slot<F::Object>, bool)> {
        let limit = self.config.limit();
        let mut ledger = self.ledger.lock();
        let mut blocked_since: Option<Instant> = None;

        loop {
            if ledger.disposed {
                return Err(PoolError::Disposed);
            }

            if let Some(slot) = ledger.generations.take() {
                if let Some(started) = blocked_since {
                    debug!(
                        pool = %self.name(),
                        waited_ms = started.elapsed().as_millis() as u64,
                        "Blocked waiting for an object to become available"
                    );
                }
                let ready_size = ledger.generations.len();
                drop(ledger);
                self.instruments.set_value(Gauge::ReadySize, ready_size);
                return Ok((slot, false));
            }

            if ledger.size < limit || !self.config.max_strict {
                let slot = self.create(&mut ledger)?;
                let (size, ready_size) = (ledger.size, ledger.generations.len());
                drop(ledger);
                self.created(slot.id, size, ready_size);
                return Ok((slot, true));
            }

            if !self.config.blocking || !wait {
                return Err(PoolError::PoolExhausted);
            }

            let Some(started) = blocked_since else {
                let current = thread::current();
                debug!(
                    pool = %self.name(),
                    thread = current.name().unwrap_or("<unnamed>"),
                    "Blocking until an object is available"
                );
                blocked_since = Some(Instant::now());
                MutexGuard::unlocked(&mut ledger, || self.instruments.increment(Counter::Blocks));
                // The lock was released; look again before sleeping.
                continue;
            };

            // A deadline past the end of `Instant` is the same as no deadline.
            let deadline = self
                .config
                .block_timeout
                .and_then(|timeout| Some((timeout, started.checked_add(timeout)?)));
            match deadline {
                Some((timeout, deadline)) => {
                    if Instant::now() >= deadline {
                        debug!(
                            pool = %self.name(),
                            waited_ms = started.elapsed().as_millis() as u64,
                            "Timed out waiting for an object to become available"
                        );
                        return Err(PoolError::Timeout(timeout));
                    }
                    self.available.wait_until(&mut ledger, deadline);
                }
                None => self.available.wait(&mut ledger),
            }
        }
    }

    /// Reserve a slot and create an object outside the lock.
    ///
    /// The lock is held again when this returns.
    fn create(&self, ledger: &mut MutexGuard<'_, Ledger<F::Object>>) -> PoolResult<Slot<F::Object>> {
        ledger.size += 1;
        let id = ledger.next_id;
        ledger.next_id += 1;

        match MutexGuard::unlocked(ledger, || self.factory.new_instance()) {
            Ok(value) => {
                let slot = Slot { id, value };
                if ledger.disposed {
                    ledger.size -= 1;
                    MutexGuard::unlocked(ledger, || self.decommission(slot));
                    return Err(PoolError::Disposed);
                }
                Ok(slot)
            }
            Err(err) => {
                ledger.size -= 1;
                if self.config.blocking {
                    self.available.notify_one();
                }
                debug!(pool = %self.name(), error = %err, "Object factory failed to create an object");
                Err(PoolError::Factory(err))
            }
        }
    }

    fn created(&self, id: usize, size: usize, ready_size: usize) {
        debug!(pool = %self.name(), id, size, "Created a new object from the object factory");
        self.instruments.increment(Counter::Creates);
        self.instruments.set_sizes(size, ready_size);
    }

    fn put(&self, mut slot: Slot<F::Object>) {
        self.factory.recycle(&mut slot.value);

        if let Some(tracker) = &self.checkouts
            && !tracker.released(slot.id)
        {
            warn!(pool = %self.name(), id = slot.id, "Returned object was not traced as outstanding");
        }

        let mut ledger = self.ledger.lock();
        let surplus = if ledger.disposed {
            debug!(pool = %self.name(), id = slot.id, "Put called after the pool was disposed");
            ledger.size -= 1;
            Some(slot)
        } else if ledger.size > self.config.limit() {
            debug!(pool = %self.name(), id = slot.id, "No room to put the object back into the pool, so removing it");
            ledger.size -= 1;
            Some(slot)
        } else {
            trace!(pool = %self.name(), id = slot.id, "Put object back into the pool");
            ledger.generations.push(slot);
            if self.config.blocking {
                self.available.notify_one();
            }
            None
        };
        let (size, ready_size) = (ledger.size, ledger.generations.len());
        drop(ledger);

        if let Some(slot) = surplus {
            self.decommission(slot);
        }
        self.instruments.increment(Counter::Puts);
        self.instruments.set_sizes(size, ready_size);
    }

    /// Forget an object that will never return to the pool
    fn remove_permanently(&self, slot: Slot<F::Object>) {
        if let Some(tracker) = &self.checkouts {
            tracker.released(slot.id);
        }

        let mut ledger = self.ledger.lock();
        ledger.size -= 1;
        if self.config.blocking {
            self.available.notify_one();
        }
        let (size, ready_size) = (ledger.size, ledger.generations.len());
        drop(ledger);

        self.decommission(slot);
        self.instruments.set_sizes(size, ready_size);
    }

    fn decommission(&self, slot: Slot<F::Object>) {
        let id = slot.id;
        match self.factory.decommission(slot.value) {
            Ok(()) => self.instruments.increment(Counter::Decommissions),
            Err(err) => debug!(pool = %self.name(), id, error = %err, "Error decommissioning object"),
        }
    }

    fn trim(&self) -> PoolResult<usize> {
        let ledger = self.ledger.lock();
        if !ledger.schedule.is_enabled() {
            return Err(PoolError::TrimmingDisabled);
        }
        Ok(self.trim_locked(ledger))
    }

    fn trim_if_due(&self) {
        let ledger = self.ledger.lock();
        if ledger.disposed || !ledger.schedule.is_due(Instant::now()) {
            return;
        }
        self.trim_locked(ledger);
    }

    fn trim_locked(&self, mut ledger: MutexGuard<'_, Ledger<F::Object>>) -> usize {
        let marked = ledger.generations.ready_len();
        let expired = ledger.generations.rotate();
        ledger.size -= expired.len();
        ledger.schedule.mark(Instant::now());
        let (size, ready_size) = (ledger.size, ledger.generations.len());
        drop(ledger);

        let trimmed = expired.len();
        if trimmed > 0 {
            debug!(pool = %self.name(), trimmed, "Trimming idle objects from pool");
        }
        trace!(pool = %self.name(), marked, "Marked objects as old");

        for slot in expired {
            self.decommission(slot);
        }
        self.instruments.set_sizes(size, ready_size);
        trimmed
    }

    fn warmup(&self, count: usize) -> PoolResult<usize> {
        let limit = self.config.limit();
        let mut created = 0;

        while created < count {
            let mut ledger = self.ledger.lock();
            if ledger.disposed {
                return Err(PoolError::Disposed);
            }
            if ledger.size >= limit {
                break;
            }

            let slot = self.create(&mut ledger)?;
            let id = slot.id;
            ledger.generations.push(slot);
            if self.config.blocking {
                self.available.notify_one();
            }
            let (size, ready_size) = (ledger.size, ledger.generations.len());
            drop(ledger);

            self.created(id, size, ready_size);
            created += 1;
        }

        Ok(created)
    }

    fn dispose(&self) {
        let mut ledger = self.ledger.lock();
        if ledger.disposed {
            return;
        }
        ledger.disposed = true;
        let idle = ledger.generations.drain();
        ledger.size -= idle.len();
        self.available.notify_all();
        let outstanding = ledger.size;
        drop(ledger);

        if outstanding > 0 {
            debug!(pool = %self.name(), outstanding, "Objects were still outstanding when the pool was disposed");
        }
        for slot in idle {
            self.decommission(slot);
        }
        self.instruments.set_sizes(outstanding, 0);
    }

    fn sizes(&self) -> (usize, usize) {
        let ledger = self.ledger.lock();
        (ledger.size, ledger.generations.len())
    }
}

impl<F: ObjectFactory> Drop for Shared<F> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Thread-safe pool that limits how many objects exist at once
///
/// Objects are created lazily by an [`ObjectFactory`] and handed out as
/// [`PooledObject`] guards which return them on drop. The most recently
/// returned object is always reused first.
///
/// With `max_strict` the pool never holds more than `max_size` objects; a
/// caller finding the pool at capacity either fails with
/// [`PoolError::PoolExhausted`] or, with `blocking`, waits until an object is
/// returned. Without `max_strict` the pool creates extra objects on demand and
/// destroys the surplus as it comes back.
///
/// # Examples
///
/// ```
/// use limiting_pool::{PoolConfiguration, PoolError, ResourceLimitingPool};
///
/// let config = PoolConfiguration::new().with_max_size(1).with_max_strict(true);
/// let pool = ResourceLimitingPool::from_fn(|| String::from("conn"), config);
///
/// let first = pool.acquire().unwrap();
/// assert!(matches!(pool.acquire(), Err(PoolError::PoolExhausted)));
///
/// let id = first.id();
/// drop(first);
/// assert_eq!(pool.acquire().unwrap().id(), id);
/// ```
pub struct ResourceLimitingPool<F: ObjectFactory> {
    shared: Arc<Shared<F>>,
}

impl<F: ObjectFactory> Clone for ResourceLimitingPool<F> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<F: ObjectFactory> fmt::Debug for ResourceLimitingPool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (size, ready_size) = self.shared.sizes();
        f.debug_struct("ResourceLimitingPool")
            .field("name", &self.shared.config.name)
            .field("size", &size)
            .field("ready_size", &ready_size)
            .field("instruments", &self.shared.instruments)
            .finish()
    }
}

impl<F: ObjectFactory> ResourceLimitingPool<F> {
    /// Create a new pool around a factory
    pub fn new(factory: F, config: PoolConfiguration) -> Self {
        Self::with_instrument_sinks(factory, config, Vec::new())
    }

    /// Create a new pool reporting to an external instrument sink
    pub fn with_instrument_sink(
        factory: F,
        config: PoolConfiguration,
        sink: Arc<dyn InstrumentSink>,
    ) -> Self {
        Self::with_instrument_sinks(factory, config, vec![sink])
    }

    /// Create a new pool reporting to several external instrument sinks
    pub fn with_instrument_sinks(
        factory: F,
        config: PoolConfiguration,
        sinks: Vec<Arc<dyn InstrumentSink>>,
    ) -> Self {
        let checkouts = config.tracing.then(CheckoutTracker::new);
        let ledger = Ledger {
            generations: Generations::new(),
            schedule: TrimSchedule::new(config.trim_interval),
            size: 0,
            next_id: 1,
            disposed: false,
        };

        debug!(
            pool = %config.name,
            max_size = ?config.max_size,
            max_strict = config.max_strict,
            blocking = config.blocking,
            "Created resource-limiting pool"
        );

        Self {
            shared: Arc::new(Shared {
                factory,
                config,
                ledger: Mutex::new(ledger),
                available: Condvar::new(),
                instruments: Instruments::new(sinks),
                checkouts,
            }),
        }
    }

    /// Get an object from the pool.
    ///
    /// Reuses an idle object if there is one, otherwise creates one if the
    /// size limit allows it. A strict pool at capacity fails with
    /// [`PoolError::PoolExhausted`] unless it is blocking, in which case the
    /// call waits for an object, failing with [`PoolError::Timeout`] once the
    /// configured block timeout has elapsed or [`PoolError::Disposed`] if the
    /// pool is disposed meanwhile.
    pub fn acquire(&self) -> PoolResult<PooledObject<F>> {
        self.shared.acquire(true)
    }

    /// Get an object only if one is available right away.
    ///
    /// Never waits, even on a blocking pool; returns `None` when the pool is
    /// at capacity, disposed, or the factory fails.
    pub fn try_acquire(&self) -> Option<PooledObject<F>> {
        self.shared.acquire(false).ok()
    }

    /// Get an object without blocking the async runtime
    ///
    /// The wait happens on tokio's blocking thread pool.
    pub async fn acquire_async(&self) -> PoolResult<PooledObject<F>> {
        let pool = self.clone();
        tokio::task::spawn_blocking(move || pool.acquire())
            .await
            .map_err(|_| PoolError::Cancelled)?
    }

    /// Destroy objects that have been idle for a whole trim interval and age
    /// the rest.
    ///
    /// Returns the number of destroyed objects. Called automatically by
    /// [`acquire`](Self::acquire) once per trim interval; pools that see no
    /// gets for long periods can call it by hand. An idle object is destroyed
    /// by the second trim that finds it unused.
    pub fn trim(&self) -> PoolResult<usize> {
        self.shared.trim()
    }

    /// Pre-create up to `count` idle objects without exceeding the size limit
    pub fn warmup(&self, count: usize) -> PoolResult<usize> {
        self.shared.warmup(count)
    }

    /// Destroy all idle objects and fail every current and future get.
    ///
    /// Objects still lent out are destroyed as they come back.
    pub fn dispose(&self) {
        self.shared.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.ledger.lock().disposed
    }

    /// Total objects created by the pool, lent out or idle
    pub fn size(&self) -> usize {
        self.shared.sizes().0
    }

    /// Idle objects waiting in the pool
    pub fn ready_size(&self) -> usize {
        self.shared.sizes().1
    }

    /// Get pool metrics
    pub fn metrics(&self) -> PoolMetrics {
        self.shared.instruments.snapshot(self.shared.config.max_size)
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.metrics().export()
    }

    /// Export metrics in Prometheus format
    pub fn export_metrics_prometheus(
        &self,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        MetricsExporter::export_prometheus(&self.metrics(), pool_name, tags)
    }

    /// Snapshot of the pool including every outstanding object.
    ///
    /// Fails with [`PoolError::TracingDisabled`] unless the pool was
    /// configured with tracing.
    pub fn state(&self) -> PoolResult<PoolState> {
        let tracker = self
            .shared
            .checkouts
            .as_ref()
            .ok_or(PoolError::TracingDisabled)?;
        let (size, ready_size) = self.shared.sizes();
        Ok(tracker.snapshot(size, ready_size))
    }

    pub fn name(&self) -> &str {
        self.shared.name()
    }

    pub fn config(&self) -> &PoolConfiguration {
        &self.shared.config
    }

    pub fn factory(&self) -> &F {
        &self.shared.factory
    }
}

impl<T, C> ResourceLimitingPool<FnFactory<T, C>>
where
    T: Send + 'static,
    C: Fn() -> T + Send + Sync + 'static,
{
    /// Create a pool whose objects come from a closure
    pub fn from_fn(create: C, config: PoolConfiguration) -> Self {
        Self::new(FnFactory::new(create), config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FactoryError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Hands out increasing numbers and counts what it destroys
    #[derive(Default)]
    struct NumberFactory {
        next: AtomicUsize,
        decommissioned: AtomicUsize,
        fail_creates: AtomicBool,
        fail_decommission: bool,
        reject_odd: AtomicBool,
    }

    impl ObjectFactory for NumberFactory {
        type Object = usize;

        fn new_instance(&self) -> Result<usize, FactoryError> {
            if self.fail_creates.load(Ordering::SeqCst) {
                return Err("factory offline".into());
            }
            Ok(self.next.fetch_add(1, Ordering::SeqCst))
        }

        fn decommission(&self, _object: usize) -> Result<(), FactoryError> {
            self.decommissioned.fetch_add(1, Ordering::SeqCst);
            if self.fail_decommission {
                return Err("decommission failed".into());
            }
            Ok(())
        }

        fn validate(&self, object: &mut usize) -> bool {
            !(self.reject_odd.load(Ordering::SeqCst) && *object % 2 == 1)
        }
    }

    fn pool(config: PoolConfiguration) -> ResourceLimitingPool<NumberFactory> {
        ResourceLimitingPool::new(NumberFactory::default(), config)
    }

    fn decommissioned(pool: &ResourceLimitingPool<NumberFactory>) -> usize {
        pool.factory().decommissioned.load(Ordering::SeqCst)
    }

    #[test]
    fn test_single_get_put() {
        let pool = pool(PoolConfiguration::default());
        assert_eq!(pool.ready_size(), 0);
        assert_eq!(pool.size(), 0);

        let obj = pool.acquire().unwrap();
        assert_eq!(pool.ready_size(), 0);
        assert_eq!(pool.size(), 1);

        drop(obj);
        assert_eq!(pool.ready_size(), 1);
        assert_eq!(pool.size(), 1);

        pool.dispose();
        assert_eq!(pool.ready_size(), 0);
        assert_eq!(pool.size(), 0);
        assert_eq!(decommissioned(&pool), 1);
    }

    #[test]
    fn test_released_object_is_reused() {
        let pool = pool(PoolConfiguration::default());

        let first = pool.acquire().unwrap();
        let id = first.id();
        let value = *first;
        first.release();

        let second = pool.acquire().unwrap();
        assert_eq!(second.id(), id);
        assert_eq!(*second, value);
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn test_reuse_is_lifo() {
        let pool = pool(PoolConfiguration::default());

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        let (a_id, b_id) = (a.id(), b.id());
        drop(a);
        drop(b);

        let newest = pool.acquire().unwrap();
        let oldest = pool.acquire().unwrap();
        assert_eq!(newest.id(), b_id);
        assert_eq!(oldest.id(), a_id);
        assert_eq!(pool.size(), 2);
    }

    #[test]
    fn test_multiple_get_put() {
        let pool = pool(PoolConfiguration::default());

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert_eq!(pool.size(), 2);
        assert_eq!(pool.ready_size(), 0);

        drop(a);
        assert_eq!(pool.ready_size(), 1);
        drop(b);
        assert_eq!(pool.ready_size(), 2);
        assert_eq!(pool.size(), 2);
    }

    #[test]
    fn test_strict_non_blocking_pool_is_exhausted() {
        let pool = pool(PoolConfiguration::new().with_max_size(2).with_max_strict(true));

        let _a = pool.acquire().unwrap();
        let _b = pool.acquire().unwrap();

        assert!(matches!(pool.acquire(), Err(PoolError::PoolExhausted)));
        assert!(pool.try_acquire().is_none());
        assert_eq!(pool.size(), 2);
    }

    #[test]
    fn test_try_acquire_does_not_wait_on_blocking_pool() {
        let pool = pool(
            PoolConfiguration::new()
                .with_max_size(1)
                .with_max_strict(true)
                .with_blocking(true),
        );
        let held = pool.acquire().unwrap();

        assert!(pool.try_acquire().is_none());
        assert_eq!(pool.metrics().blocks, 0);

        drop(held);
        assert!(pool.try_acquire().is_some());
    }

    #[test]
    fn test_non_strict_pool_overflows_then_shrinks() {
        let pool = pool(PoolConfiguration::new().with_max_size(1));

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        let c = pool.acquire().unwrap();
        assert_eq!(pool.size(), 3);

        drop(a);
        drop(b);
        assert_eq!(pool.size(), 1);
        assert_eq!(decommissioned(&pool), 2);

        drop(c);
        assert_eq!(pool.size(), 1);
        assert_eq!(pool.ready_size(), 1);
    }

    #[test]
    fn test_factory_failure_propagates_and_frees_slot() {
        let pool = pool(PoolConfiguration::new().with_max_size(1).with_max_strict(true));
        pool.factory().fail_creates.store(true, Ordering::SeqCst);

        let err = pool.acquire().unwrap_err();
        assert!(matches!(err, PoolError::Factory(_)));
        assert_eq!(pool.size(), 0);

        pool.factory().fail_creates.store(false, Ordering::SeqCst);
        assert!(pool.acquire().is_ok());
    }

    #[test]
    fn test_blocking_timeout() {
        let timeout = Duration::from_millis(100);
        let pool = pool(
            PoolConfiguration::new()
                .with_max_size(1)
                .with_max_strict(true)
                .with_blocking(true)
                .with_block_timeout(timeout),
        );
        let _held = pool.acquire().unwrap();

        let start = Instant::now();
        let result = pool.acquire();

        assert!(matches!(result, Err(PoolError::Timeout(t)) if t == timeout));
        assert!(start.elapsed() >= timeout);
        assert_eq!(pool.metrics().blocks, 1);
    }

    #[test]
    fn test_trim_destroys_objects_idle_for_two_cycles() {
        let pool = pool(PoolConfiguration::new().with_trim_interval(Duration::from_secs(3600)));

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        drop(a);
        drop(b);
        assert_eq!(pool.ready_size(), 2);

        assert_eq!(pool.trim().unwrap(), 0);
        assert_eq!(pool.ready_size(), 2);

        assert_eq!(pool.trim().unwrap(), 2);
        assert_eq!(pool.ready_size(), 0);
        assert_eq!(pool.size(), 0);
        assert_eq!(decommissioned(&pool), 2);
    }

    #[test]
    fn test_used_object_survives_trimming() {
        let pool = pool(PoolConfiguration::new().with_trim_interval(Duration::from_secs(3600)));
        let id = pool.acquire().unwrap().id();

        for _ in 0..4 {
            pool.trim().unwrap();
            let obj = pool.acquire().unwrap();
            assert_eq!(obj.id(), id);
        }

        assert_eq!(decommissioned(&pool), 0);
    }

    #[test]
    fn test_trim_without_interval_fails() {
        let pool = pool(PoolConfiguration::default());
        assert!(matches!(pool.trim(), Err(PoolError::TrimmingDisabled)));
    }

    #[test]
    fn test_acquire_trims_when_due() {
        let pool = pool(PoolConfiguration::new().with_trim_interval(Duration::from_millis(20)));

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        let kept = b.id();
        drop(a);
        drop(b);

        // First due trim ages both, second destroys them.
        thread::sleep(Duration::from_millis(30));
        let obj = pool.acquire().unwrap();
        assert_eq!(obj.id(), kept);
        drop(obj);

        thread::sleep(Duration::from_millis(30));
        let _obj = pool.acquire().unwrap();

        assert_eq!(decommissioned(&pool), 1);
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn test_acquire_after_dispose_fails() {
        let pool = pool(PoolConfiguration::default());
        pool.dispose();
        pool.dispose();

        assert!(pool.is_disposed());
        assert!(matches!(pool.acquire(), Err(PoolError::Disposed)));
    }

    #[test]
    fn test_object_returned_after_dispose_is_destroyed() {
        let pool = pool(PoolConfiguration::default());
        let obj = pool.acquire().unwrap();

        pool.dispose();
        assert_eq!(pool.size(), 1);

        drop(obj);
        assert_eq!(pool.size(), 0);
        assert_eq!(pool.ready_size(), 0);
        assert_eq!(decommissioned(&pool), 1);
    }

    #[test]
    fn test_decommission_errors_are_swallowed() {
        let factory = NumberFactory {
            fail_decommission: true,
            ..Default::default()
        };
        let pool = ResourceLimitingPool::new(factory, PoolConfiguration::default());
        drop(pool.acquire().unwrap());

        pool.dispose();

        assert_eq!(pool.size(), 0);
        assert_eq!(pool.metrics().decommissions, 0);
        assert_eq!(decommissioned(&pool), 1);
    }

    #[test]
    fn test_dropping_pool_decommissions_idle_objects() {
        let destroyed = Arc::new(AtomicUsize::new(0));

        struct Tracked(Arc<AtomicUsize>);
        impl ObjectFactory for Tracked {
            type Object = ();
            fn new_instance(&self) -> Result<(), FactoryError> {
                Ok(())
            }
            fn decommission(&self, _object: ()) -> Result<(), FactoryError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let pool = ResourceLimitingPool::new(Tracked(Arc::clone(&destroyed)), PoolConfiguration::default());
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        drop(a);
        drop(pool);
        assert_eq!(destroyed.load(Ordering::SeqCst), 0);

        drop(b);
        assert_eq!(destroyed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_invalid_object_is_replaced() {
        let pool = pool(PoolConfiguration::default());
        let zero = pool.acquire().unwrap();
        let one = pool.acquire().unwrap();
        assert_eq!((*zero, *one), (0, 1));
        drop(zero);
        drop(one);

        pool.factory().reject_odd.store(true, Ordering::SeqCst);

        let obj = pool.acquire().unwrap();
        assert_eq!(*obj, 0);
        assert_eq!(pool.size(), 1);
        assert_eq!(decommissioned(&pool), 1);
    }

    #[test]
    fn test_discard_frees_capacity() {
        let pool = pool(PoolConfiguration::new().with_max_size(1).with_max_strict(true));

        let obj = pool.acquire().unwrap();
        obj.discard();

        assert_eq!(pool.size(), 0);
        assert_eq!(decommissioned(&pool), 1);
        assert!(pool.acquire().is_ok());
        assert_eq!(pool.metrics().puts, 0);
    }

    #[test]
    fn test_warmup_respects_limit() {
        let pool = pool(PoolConfiguration::new().with_max_size(3));

        assert_eq!(pool.warmup(5).unwrap(), 3);
        assert_eq!(pool.size(), 3);
        assert_eq!(pool.ready_size(), 3);
        assert_eq!(pool.warmup(1).unwrap(), 0);
        assert_eq!(pool.metrics().creates, 3);
    }

    #[test]
    fn test_state_tracks_outstanding_objects() {
        let pool = pool(PoolConfiguration::new().with_tracing(true));

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        let b_id = b.id();
        drop(a);

        let state = pool.state().unwrap();
        assert_eq!(state.size, 2);
        assert_eq!(state.ready_size, 1);
        assert_eq!(state.outstanding.len(), 1);
        assert_eq!(state.outstanding[0].id, b_id);

        drop(b);
        assert!(pool.state().unwrap().outstanding.is_empty());
    }

    #[test]
    fn test_state_without_tracing_fails() {
        let pool = pool(PoolConfiguration::default());
        assert!(matches!(pool.state(), Err(PoolError::TracingDisabled)));
    }

    #[test]
    fn test_metrics_count_events() {
        let pool = pool(PoolConfiguration::new().with_max_size(4));

        let a = pool.acquire().unwrap();
        drop(a);
        let b = pool.acquire().unwrap();
        drop(b);

        let metrics = pool.metrics();
        assert_eq!(metrics.gets, 2);
        assert_eq!(metrics.puts, 2);
        assert_eq!(metrics.creates, 1);
        assert_eq!(metrics.size, 1);
        assert_eq!(metrics.ready_size, 1);
        assert_eq!(metrics.max_size, Some(4));
        assert_eq!(pool.export_metrics()["gets"], "2");
    }

    #[tokio::test]
    async fn test_acquire_async() {
        let pool = pool(PoolConfiguration::new().with_max_size(1).with_max_strict(true));

        let obj = pool.acquire_async().await.unwrap();
        assert_eq!(*obj, 0);
        assert!(matches!(pool.acquire_async().await, Err(PoolError::PoolExhausted)));
    }
}
