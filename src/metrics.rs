//! Instrumentation for object pools
//!
//! The pool reports five counters and two gauges. Every pool keeps its own
//! in-process totals (see [`PoolMetrics`]) and additionally forwards each
//! event to any [`InstrumentSink`] supplied at construction.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Event counters reported by the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    /// An object was handed out
    Gets,
    /// An object was handed back
    Puts,
    /// A caller had to wait for an object
    Blocks,
    /// The factory created an object
    Creates,
    /// The factory destroyed an object
    Decommissions,
}

impl Counter {
    pub const ALL: [Counter; 5] = [
        Counter::Gets,
        Counter::Puts,
        Counter::Blocks,
        Counter::Creates,
        Counter::Decommissions,
    ];

    /// Instrument name
    pub fn name(self) -> &'static str {
        match self {
            Counter::Gets => "gets",
            Counter::Puts => "puts",
            Counter::Blocks => "blocks",
            Counter::Creates => "creates",
            Counter::Decommissions => "decommissions",
        }
    }
}

/// Point-in-time values reported by the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gauge {
    /// Total live objects, lent out or idle
    Size,
    /// Idle objects in both generations
    ReadySize,
}

impl Gauge {
    /// Instrument name
    pub fn name(self) -> &'static str {
        match self {
            Gauge::Size => "size",
            Gauge::ReadySize => "ready-size",
        }
    }
}

/// Receives pool instrumentation events.
///
/// Sinks are purely observational. They are called outside the pool lock
/// and must not block for long.
///
/// # Examples
///
/// ```
/// use limiting_pool::{Counter, FnFactory, Gauge, InstrumentSink, PoolConfiguration, ResourceLimitingPool};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Default)]
/// struct CreatesOnly(AtomicUsize);
///
/// impl InstrumentSink for CreatesOnly {
///     fn increment(&self, counter: Counter) {
///         if counter == Counter::Creates {
///             self.0.fetch_add(1, Ordering::Relaxed);
///         }
///     }
///
///     fn set_value(&self, _gauge: Gauge, _value: usize) {}
/// }
///
/// let sink = Arc::new(CreatesOnly::default());
/// let pool = ResourceLimitingPool::with_instrument_sink(
///     FnFactory::new(|| 0u32),
///     PoolConfiguration::default(),
///     sink.clone(),
/// );
///
/// drop(pool.acquire().unwrap());
/// assert_eq!(sink.0.load(Ordering::Relaxed), 1);
/// ```
pub trait InstrumentSink: Send + Sync {
    fn increment(&self, counter: Counter);

    fn set_value(&self, gauge: Gauge, value: usize);
}

/// Metrics data for a pool
///
/// # Examples
///
/// ```
/// use limiting_pool::{FnFactory, PoolConfiguration, ResourceLimitingPool};
///
/// let pool = ResourceLimitingPool::from_fn(|| 1, PoolConfiguration::default());
///
/// {
///     let _obj = pool.acquire().unwrap();
///     let metrics = pool.metrics();
///     assert_eq!(metrics.gets, 1);
///     assert_eq!(metrics.creates, 1);
///     assert_eq!(metrics.size, 1);
/// }
///
/// assert_eq!(pool.metrics().puts, 1);
/// assert_eq!(pool.metrics().ready_size, 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolMetrics {
    /// Objects handed out
    pub gets: u64,

    /// Objects handed back
    pub puts: u64,

    /// Callers that had to wait
    pub blocks: u64,

    /// Objects created by the factory
    pub creates: u64,

    /// Objects destroyed by the factory
    pub decommissions: u64,

    /// Live objects, lent out or idle
    pub size: usize,

    /// Idle objects
    pub ready_size: usize,

    /// Configured limit, if any
    pub max_size: Option<usize>,

    /// Share of the limit currently in use (0.0 to 1.0); zero when unlimited
    pub utilization: f64,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("gets".to_string(), self.gets.to_string());
        metrics.insert("puts".to_string(), self.puts.to_string());
        metrics.insert("blocks".to_string(), self.blocks.to_string());
        metrics.insert("creates".to_string(), self.creates.to_string());
        metrics.insert("decommissions".to_string(), self.decommissions.to_string());
        metrics.insert("size".to_string(), self.size.to_string());
        metrics.insert("ready-size".to_string(), self.ready_size.to_string());
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        if let Some(max) = self.max_size {
            metrics.insert("max-size".to_string(), max.to_string());
        }
        metrics
    }

    pub(crate) fn counter(&self, counter: Counter) -> u64 {
        match counter {
            Counter::Gets => self.gets,
            Counter::Puts => self.puts,
            Counter::Blocks => self.blocks,
            Counter::Creates => self.creates,
            Counter::Decommissions => self.decommissions,
        }
    }
}

/// Metrics exporter for Prometheus format
#[derive(Debug)]
pub struct MetricsExporter;

impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use limiting_pool::{PoolConfiguration, ResourceLimitingPool};
    /// use std::collections::HashMap;
    ///
    /// let pool = ResourceLimitingPool::from_fn(|| 1, PoolConfiguration::default());
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "api".to_string());
    ///
    /// let output = pool.export_metrics_prometheus("my_pool", Some(&tags));
    /// assert!(output.contains("limiting_pool_size"));
    /// assert!(output.contains("service=\"api\""));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        let mut output = String::new();
        let labels = Self::format_labels(pool_name, tags);

        output.push_str("# HELP limiting_pool_size Live objects, lent out or idle\n");
        output.push_str("# TYPE limiting_pool_size gauge\n");
        output.push_str(&format!("limiting_pool_size{{{}}} {}\n", labels, metrics.size));

        output.push_str("# HELP limiting_pool_ready_size Idle objects\n");
        output.push_str("# TYPE limiting_pool_ready_size gauge\n");
        output.push_str(&format!("limiting_pool_ready_size{{{}}} {}\n", labels, metrics.ready_size));

        output.push_str("# HELP limiting_pool_utilization Share of the size limit in use\n");
        output.push_str("# TYPE limiting_pool_utilization gauge\n");
        output.push_str(&format!("limiting_pool_utilization{{{}}} {:.2}\n", labels, metrics.utilization));

        for counter in Counter::ALL {
            let name = counter.name();
            output.push_str(&format!("# HELP limiting_pool_{name}_total Total {name}\n"));
            output.push_str(&format!("# TYPE limiting_pool_{name}_total counter\n"));
            output.push_str(&format!(
                "limiting_pool_{}_total{{{}}} {}\n",
                name,
                labels,
                metrics.counter(counter)
            ));
        }

        output
    }

    fn format_labels(pool_name: &str, tags: Option<&HashMap<String, String>>) -> String {
        let mut labels = vec![format!("pool=\"{}\"", pool_name)];

        if let Some(tags) = tags {
            let mut tags: Vec<_> = tags.iter().collect();
            tags.sort();
            for (key, value) in tags {
                labels.push(format!("{}=\"{}\"", key, value));
            }
        }

        labels.join(",")
    }
}

/// Internal metrics tracker
pub(crate) struct MetricsTracker {
    gets: AtomicU64,
    puts: AtomicU64,
    blocks: AtomicU64,
    creates: AtomicU64,
    decommissions: AtomicU64,
    size: AtomicUsize,
    ready_size: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self {
            gets: AtomicU64::new(0),
            puts: AtomicU64::new(0),
            blocks: AtomicU64::new(0),
            creates: AtomicU64::new(0),
            decommissions: AtomicU64::new(0),
            size: AtomicUsize::new(0),
            ready_size: AtomicUsize::new(0),
        }
    }

    fn counter(&self, counter: Counter) -> &AtomicU64 {
        match counter {
            Counter::Gets => &self.gets,
            Counter::Puts => &self.puts,
            Counter::Blocks => &self.blocks,
            Counter::Creates => &self.creates,
            Counter::Decommissions => &self.decommissions,
        }
    }

    pub fn get_metrics(&self, max_size: Option<usize>) -> PoolMetrics {
        let size = self.size.load(Ordering::Relaxed);
        let ready_size = self.ready_size.load(Ordering::Relaxed);
        let utilization = match max_size {
            Some(max) if max > 0 => size.saturating_sub(ready_size) as f64 / max as f64,
            _ => 0.0,
        };

        PoolMetrics {
            gets: self.gets.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
            blocks: self.blocks.load(Ordering::Relaxed),
            creates: self.creates.load(Ordering::Relaxed),
            decommissions: self.decommissions.load(Ordering::Relaxed),
            size,
            ready_size,
            max_size,
            utilization,
        }
    }
}

impl InstrumentSink for MetricsTracker {
    fn increment(&self, counter: Counter) {
        self.counter(counter).fetch_add(1, Ordering::Relaxed);
    }

    fn set_value(&self, gauge: Gauge, value: usize) {
        match gauge {
            Gauge::Size => self.size.store(value, Ordering::Relaxed),
            Gauge::ReadySize => self.ready_size.store(value, Ordering::Relaxed),
        }
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// The built-in tracker plus any external sinks
pub(crate) struct Instruments {
    tracker: MetricsTracker,
    sinks: Vec<Arc<dyn InstrumentSink>>,
}

impl Instruments {
    pub fn new(sinks: Vec<Arc<dyn InstrumentSink>>) -> Self {
        Self {
            tracker: MetricsTracker::new(),
            sinks,
        }
    }

    pub fn increment(&self, counter: Counter) {
        self.tracker.increment(counter);
        for sink in &self.sinks {
            sink.increment(counter);
        }
    }

    pub fn set_value(&self, gauge: Gauge, value: usize) {
        self.tracker.set_value(gauge, value);
        for sink in &self.sinks {
            sink.set_value(gauge, value);
        }
    }

    /// Report both gauges at once
    pub fn set_sizes(&self, size: usize, ready_size: usize) {
        self.set_value(Gauge::Size, size);
        self.set_value(Gauge::ReadySize, ready_size);
    }

    pub fn snapshot(&self, max_size: Option<usize>) -> PoolMetrics {
        self.tracker.get_metrics(max_size)
    }
}

impl fmt::Debug for Instruments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instruments")
            .field("sinks", &self.sinks.len())
            .finish_non_exhaustive()
    }
}
