use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// One-shot stop flag shared by the controller and its workers.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the flag to stopped. Returns false if it was already stopped.
    pub fn trigger(&self) -> bool {
        !self.0.swap(true, Ordering::Release)
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Sum of every worker's successful attempts.
#[derive(Debug, Clone, Default)]
pub struct AggregateCount(Arc<AtomicU64>);

impl AggregateCount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, count: u64) {
        self.0.fetch_add(count, Ordering::AcqRel);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_signal_triggers_once() {
        let stop = StopSignal::new();
        let seen_by_worker = stop.clone();
        assert!(!seen_by_worker.is_stopped());

        assert!(stop.trigger());
        assert!(seen_by_worker.is_stopped());
        assert!(!stop.trigger());
        assert!(seen_by_worker.is_stopped());
    }

    #[test]
    fn test_aggregate_sums_across_threads() {
        let aggregate = AggregateCount::new();
        let handles: Vec<_> = (1..=8u64)
            .map(|n| {
                let aggregate = aggregate.clone();
                std::thread::spawn(move || aggregate.add(n))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(aggregate.get(), 36);
    }
}
