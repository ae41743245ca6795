//! Two-generation idle trimming
//!
//! Idle objects live in one of two lists. Returned objects always go to the
//! "ready" list. Each trim destroys whatever is still sitting in the
//! "old-ready" list and then turns the ready list into the old-ready list.
//! An object therefore survives at most two trims without being used, and no
//! per-object timestamps are needed.

use std::mem;
use std::time::{Duration, Instant};

/// An idle pooled object together with its pool-unique id
#[derive(Debug)]
pub(crate) struct Slot<T> {
    pub id: usize,
    pub value: T,
}

/// Ready and old-ready lists
#[derive(Debug)]
pub(crate) struct Generations<T> {
    ready: Vec<Slot<T>>,
    old_ready: Vec<Slot<T>>,
}

impl<T> Generations<T> {
    pub fn new() -> Self {
        Self {
            ready: Vec::new(),
            old_ready: Vec::new(),
        }
    }

    /// Take the most recently returned object, preferring the ready list
    pub fn take(&mut self) -> Option<Slot<T>> {
        self.ready.pop().or_else(|| self.old_ready.pop())
    }

    pub fn push(&mut self, slot: Slot<T>) {
        self.ready.push(slot);
    }

    /// Number of idle objects in both generations
    pub fn len(&self) -> usize {
        self.ready.len() + self.old_ready.len()
    }

    /// Age both generations by one step.
    ///
    /// Returns the old-ready objects, which the caller must destroy.
    pub fn rotate(&mut self) -> Vec<Slot<T>> {
        let expired = mem::take(&mut self.old_ready);
        self.old_ready = mem::take(&mut self.ready);
        expired
    }

    /// Empty both generations
    pub fn drain(&mut self) -> Vec<Slot<T>> {
        let mut all = mem::take(&mut self.ready);
        all.append(&mut self.old_ready);
        all
    }

    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    #[cfg(test)]
    pub fn old_ready_len(&self) -> usize {
        self.old_ready.len()
    }
}

/// When the next automatic trim is due
#[derive(Debug, Clone)]
pub(crate) struct TrimSchedule {
    interval: Option<Duration>,
    last_trim: Instant,
}

impl TrimSchedule {
    pub fn new(interval: Option<Duration>) -> Self {
        Self {
            interval,
            last_trim: Instant::now(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.interval.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match self.interval {
            Some(interval) => now.saturating_duration_since(self.last_trim) >= interval,
            None => false,
        }
    }

    pub fn mark(&mut self, now: Instant) {
        self.last_trim = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(id: usize) -> Slot<&'static str> {
        Slot { id, value: "obj" }
    }

    fn ids(slots: &[Slot<&'static str>]) -> Vec<usize> {
        slots.iter().map(|s| s.id).collect()
    }

    #[test]
    fn test_take_is_lifo_and_prefers_ready() {
        let mut generations = Generations::new();
        generations.push(slot(1));
        generations.push(slot(2));
        assert!(generations.rotate().is_empty());
        generations.push(slot(3));

        assert_eq!(generations.take().unwrap().id, 3);
        assert_eq!(generations.take().unwrap().id, 2);
        assert_eq!(generations.take().unwrap().id, 1);
        assert!(generations.take().is_none());
    }

    #[test]
    fn test_idle_object_expires_on_second_rotation() {
        let mut generations = Generations::new();
        generations.push(slot(1));

        assert!(generations.rotate().is_empty());
        assert_eq!(generations.ready_len(), 0);
        assert_eq!(generations.old_ready_len(), 1);

        let expired = generations.rotate();
        assert_eq!(ids(&expired), vec![1]);
        assert_eq!(generations.len(), 0);
    }

    #[test]
    fn test_reused_object_survives_rotations() {
        let mut generations = Generations::new();
        generations.push(slot(7));

        for _ in 0..5 {
            assert!(generations.rotate().is_empty());
            let reused = generations.take().unwrap();
            generations.push(reused);
        }

        assert_eq!(generations.ready_len(), 1);
    }

    #[test]
    fn test_drain_empties_both_generations() {
        let mut generations = Generations::new();
        generations.push(slot(1));
        generations.rotate();
        generations.push(slot(2));

        let mut drained = ids(&generations.drain());
        drained.sort_unstable();

        assert_eq!(drained, vec![1, 2]);
        assert_eq!(generations.len(), 0);
    }

    #[test]
    fn test_schedule_without_interval_is_never_due() {
        let schedule = TrimSchedule::new(None);
        assert!(!schedule.is_enabled());
        assert!(!schedule.is_due(Instant::now() + Duration::from_secs(3600)));
    }

    #[test]
    fn test_schedule_due_after_interval() {
        let start = Instant::now();
        let mut schedule = TrimSchedule::new(Some(Duration::from_millis(100)));
        schedule.mark(start);

        assert!(!schedule.is_due(start + Duration::from_millis(50)));
        assert!(schedule.is_due(start + Duration::from_millis(100)));
    }
}
