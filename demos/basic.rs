//! Basic usage examples for ResourceLimitingPool

use std::time::Duration;

use limiting_pool::{FactoryError, ObjectFactory, PoolConfiguration, ResourceLimitingPool};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== ResourceLimitingPool - Basic Examples ===\n");

    // Example 1: Closure-backed pool
    simple_pool();

    // Example 2: Custom factory with recycle and validation
    custom_factory();

    // Example 3: Trimming idle objects
    trimming();

    // Example 4: Metrics
    metrics();
}

fn simple_pool() {
    println!("1. Simple Pool:");
    let pool = ResourceLimitingPool::from_fn(|| String::with_capacity(128), PoolConfiguration::default());

    {
        let mut s = pool.acquire().unwrap();
        s.push_str("hello");
        println!("   Got object #{}: {:?}", s.id(), *s);
        // Object automatically returned when dropped
    }

    println!("   Ready after return: {}\n", pool.ready_size());
}

struct Connection {
    open: bool,
    queries: usize,
}

struct ConnectionFactory;

impl ObjectFactory for ConnectionFactory {
    type Object = Connection;

    fn new_instance(&self) -> Result<Connection, FactoryError> {
        Ok(Connection {
            open: true,
            queries: 0,
        })
    }

    fn decommission(&self, connection: Connection) -> Result<(), FactoryError> {
        println!("   Closing connection after {} queries", connection.queries);
        Ok(())
    }

    fn recycle(&self, connection: &mut Connection) {
        connection.queries = 0;
    }

    fn validate(&self, connection: &mut Connection) -> bool {
        connection.open
    }
}

fn custom_factory() {
    println!("2. Custom Factory:");
    let pool = ResourceLimitingPool::new(
        ConnectionFactory,
        PoolConfiguration::new()
            .with_name("db")
            .with_max_size(2)
            .with_max_strict(true),
    );

    {
        let mut conn = pool.acquire().unwrap();
        conn.queries += 3;
        // Simulate a dropped connection; validation rejects it on the next get
        conn.open = false;
    }

    let conn = pool.acquire().unwrap();
    println!("   Got a fresh connection #{} (open: {})", conn.id(), conn.open);
    println!("   Pool size: {}\n", pool.size());
}

fn trimming() {
    println!("3. Trimming:");
    let pool = ResourceLimitingPool::from_fn(|| 0u64, PoolConfiguration::new().with_trim_interval(Duration::from_secs(60)));

    let a = pool.acquire().unwrap();
    let b = pool.acquire().unwrap();
    drop(a);
    drop(b);

    println!("   First trim removed {}", pool.trim().unwrap());
    println!("   Second trim removed {}", pool.trim().unwrap());
    println!("   Size after trimming: {}\n", pool.size());
}

fn metrics() {
    println!("4. Metrics:");
    let pool = ResourceLimitingPool::from_fn(|| vec![0u8; 64], PoolConfiguration::new().with_max_size(4));
    pool.warmup(2).unwrap();

    for _ in 0..5 {
        let _buf = pool.acquire().unwrap();
    }

    for (key, value) in pool.export_metrics() {
        println!("   {key}: {value}");
    }
    println!();
    print!("{}", pool.export_metrics_prometheus("buffers", None));
}
