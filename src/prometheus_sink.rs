//! Instrument sink backed by a `prometheus` registry

use std::fmt;

use prometheus::{IntCounter, IntGauge, Opts, Registry};

use crate::metrics::{Counter, Gauge, InstrumentSink};

/// Publishes pool instruments as Prometheus collectors
///
/// Counters are registered as `limiting_pool_<name>_total` and gauges as
/// `limiting_pool_size` / `limiting_pool_ready_size`, all labelled with the
/// pool name.
///
/// # Examples
///
/// ```
/// use limiting_pool::{PoolConfiguration, PrometheusSink, ResourceLimitingPool, FnFactory};
/// use prometheus::Registry;
/// use std::sync::Arc;
///
/// let registry = Registry::new();
/// let sink = PrometheusSink::register(&registry, "buffers").unwrap();
/// let pool = ResourceLimitingPool::with_instrument_sink(
///     FnFactory::new(|| vec![0u8; 16]),
///     PoolConfiguration::new().with_name("buffers"),
///     Arc::new(sink),
/// );
///
/// drop(pool.acquire().unwrap());
///
/// let families = registry.gather();
/// assert!(families.iter().any(|f| f.get_name() == "limiting_pool_gets_total"));
/// ```
#[derive(Clone)]
pub struct PrometheusSink {
    gets: IntCounter,
    puts: IntCounter,
    blocks: IntCounter,
    creates: IntCounter,
    decommissions: IntCounter,
    size: IntGauge,
    ready_size: IntGauge,
}

impl PrometheusSink {
    /// Create the collectors and register them with `registry`
    pub fn register(registry: &Registry, pool_name: &str) -> prometheus::Result<Self> {
        let counter = |counter: Counter| -> prometheus::Result<IntCounter> {
            let name = counter.name();
            let collector = IntCounter::with_opts(
                Opts::new(format!("limiting_pool_{name}_total"), format!("Total {name}"))
                    .const_label("pool", pool_name),
            )?;
            registry.register(Box::new(collector.clone()))?;
            Ok(collector)
        };
        let gauge = |name: &str, help: &str| -> prometheus::Result<IntGauge> {
            let collector = IntGauge::with_opts(
                Opts::new(format!("limiting_pool_{name}"), help).const_label("pool", pool_name),
            )?;
            registry.register(Box::new(collector.clone()))?;
            Ok(collector)
        };

        Ok(Self {
            gets: counter(Counter::Gets)?,
            puts: counter(Counter::Puts)?,
            blocks: counter(Counter::Blocks)?,
            creates: counter(Counter::Creates)?,
            decommissions: counter(Counter::Decommissions)?,
            size: gauge("size", "Live objects, lent out or idle")?,
            ready_size: gauge("ready_size", "Idle objects")?,
        })
    }
}

impl fmt::Debug for PrometheusSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrometheusSink")
            .field("gets", &self.gets.get())
            .field("puts", &self.puts.get())
            .field("size", &self.size.get())
            .finish_non_exhaustive()
    }
}

impl InstrumentSink for PrometheusSink {
    fn increment(&self, counter: Counter) {
        match counter {
            Counter::Gets => self.gets.inc(),
            Counter::Puts => self.puts.inc(),
            Counter::Blocks => self.blocks.inc(),
            Counter::Creates => self.creates.inc(),
            Counter::Decommissions => self.decommissions.inc(),
        }
    }

    fn set_value(&self, gauge: Gauge, value: usize) {
        let value = i64::try_from(value).unwrap_or(i64::MAX);
        match gauge {
            Gauge::Size => self.size.set(value),
            Gauge::ReadySize => self.ready_size.set(value),
        }
    }
}
