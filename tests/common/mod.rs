#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use limiting_pool::{FactoryError, ObjectFactory};

/// Creates numbered objects and keeps score of live ones
#[derive(Debug, Default)]
pub struct CountingFactory {
    created: AtomicUsize,
    decommissioned: AtomicUsize,
    live: AtomicUsize,
    peak_live: AtomicUsize,
}

impl CountingFactory {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn decommissioned(&self) -> usize {
        self.decommissioned.load(Ordering::SeqCst)
    }

    pub fn peak_live(&self) -> usize {
        self.peak_live.load(Ordering::SeqCst)
    }
}

impl ObjectFactory for CountingFactory {
    type Object = usize;

    fn new_instance(&self) -> Result<usize, FactoryError> {
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_live.fetch_max(live, Ordering::SeqCst);
        Ok(self.created.fetch_add(1, Ordering::SeqCst))
    }

    fn decommission(&self, _object: usize) -> Result<(), FactoryError> {
        self.live.fetch_sub(1, Ordering::SeqCst);
        self.decommissioned.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
