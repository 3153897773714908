use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time;
use tracing::{error, info};

use super::signal::{AggregateCount, StopSignal};
use super::worker::{FailureTally, LoadWorker, Target};
use crate::error::{HarnessError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkSummary {
    pub total_count: u64,
    pub duration_seconds: f64,
    pub requests_per_second: f64,
    /// Wall clock from spawn to last join, including shutdown slack.
    pub elapsed_seconds: f64,
    pub workers: usize,
    pub failures: FailureTally,
}

impl fmt::Display for BenchmarkSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Workers: {}", self.workers)?;
        writeln!(f, "Total requests: {}", self.total_count)?;
        writeln!(f, "Failed attempts: {}", self.failures.total())?;
        writeln!(
            f,
            "  refused: {}, reset: {}, timed out: {}, other: {}",
            self.failures.refused, self.failures.reset, self.failures.timed_out, self.failures.other
        )?;
        writeln!(f, "Duration: {:.2}s", self.duration_seconds)?;
        writeln!(f, "Elapsed: {:.2}s", self.elapsed_seconds)?;
        write!(f, "Requests/sec: {:.2}", self.requests_per_second)
    }
}

pub struct BenchmarkController<T> {
    target: Arc<T>,
    workers: usize,
    duration: Duration,
}

impl<T: Target> BenchmarkController<T> {
    pub fn new(target: T, workers: usize, duration: Duration) -> Result<Self> {
        if workers == 0 {
            return Err(HarnessError::InvalidBenchmark(
                "worker count must be at least 1".into(),
            ));
        }
        if duration.is_zero() {
            return Err(HarnessError::InvalidBenchmark(
                "duration must be greater than zero".into(),
            ));
        }

        Ok(Self {
            target: Arc::new(target),
            workers,
            duration,
        })
    }

    /// Runs every worker for the configured duration, then stops and joins
    /// them before reading the aggregate.
    pub async fn run(&self) -> BenchmarkSummary {
        let stop = StopSignal::new();
        let aggregate = AggregateCount::new();
        let start = Instant::now();

        info!(
            "Starting benchmark with {} workers for {:?}",
            self.workers, self.duration
        );

        let tasks: Vec<_> = (0..self.workers)
            .map(|id| {
                let worker =
                    LoadWorker::new(id, self.target.clone(), stop.clone(), aggregate.clone());
                tokio::spawn(worker.run())
            })
            .collect();

        time::sleep(self.duration).await;
        stop.trigger();

        let mut failures = FailureTally::default();
        for joined in join_all(tasks).await {
            match joined {
                Ok(result) => failures.merge(&result.failures),
                Err(e) => error!("Load worker task failed: {}", e),
            }
        }

        let total_count = aggregate.get();
        let elapsed = start.elapsed();
        let duration_seconds = self.duration.as_secs_f64();

        info!(
            "Benchmark finished: {} requests in {:.2}s",
            total_count,
            elapsed.as_secs_f64()
        );

        BenchmarkSummary {
            total_count,
            duration_seconds,
            requests_per_second: total_count as f64 / duration_seconds,
            elapsed_seconds: elapsed.as_secs_f64(),
            workers: self.workers,
            failures,
        }
    }
}
