use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time;
use tracing::debug;

use super::signal::{AggregateCount, StopSignal};
use crate::net::{self, ConnectionError};

/// Result of one connect/send/recv exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Refused,
    Reset,
    TimedOut,
    Other(String),
}

impl From<ConnectionError> for AttemptOutcome {
    fn from(e: ConnectionError) -> Self {
        match e {
            ConnectionError::Refused => AttemptOutcome::Refused,
            ConnectionError::Reset => AttemptOutcome::Reset,
            ConnectionError::TimedOut => AttemptOutcome::TimedOut,
            other => AttemptOutcome::Other(other.to_string()),
        }
    }
}

/// Something a load worker can hit once per iteration.
pub trait Target: Send + Sync + 'static {
    fn attempt(&self) -> impl Future<Output = AttemptOutcome> + Send;
}

/// Opens a fresh connection per attempt, sends the payload and waits for any
/// response. The whole exchange is bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct TcpTarget {
    addr: String,
    payload: Vec<u8>,
    timeout: Duration,
}

impl TcpTarget {
    pub fn new(addr: impl Into<String>, payload: impl Into<Vec<u8>>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            payload: payload.into(),
            timeout,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn exchange(&self) -> Result<(), ConnectionError> {
        let mut stream = net::connect(&self.addr, self.timeout).await?;
        stream.write_all(&self.payload).await?;

        // a zero-length read means the peer closed, which still ends the exchange
        let mut buf = [0u8; 1024];
        stream.read(&mut buf).await?;
        Ok(())
    }
}

impl Target for TcpTarget {
    async fn attempt(&self) -> AttemptOutcome {
        match time::timeout(self.timeout, self.exchange()).await {
            Ok(Ok(())) => AttemptOutcome::Success,
            Ok(Err(e)) => e.into(),
            Err(_) => AttemptOutcome::TimedOut,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureTally {
    pub refused: u64,
    pub reset: u64,
    pub timed_out: u64,
    pub other: u64,
}

impl FailureTally {
    pub fn total(&self) -> u64 {
        self.refused + self.reset + self.timed_out + self.other
    }

    pub fn merge(&mut self, other: &FailureTally) {
        self.refused += other.refused;
        self.reset += other.reset;
        self.timed_out += other.timed_out;
        self.other += other.other;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadResult {
    pub worker_id: usize,
    pub attempted_count: u64,
    pub failures: FailureTally,
}

pub struct LoadWorker<T> {
    id: usize,
    target: Arc<T>,
    stop: StopSignal,
    aggregate: AggregateCount,
}

impl<T: Target> LoadWorker<T> {
    pub fn new(id: usize, target: Arc<T>, stop: StopSignal, aggregate: AggregateCount) -> Self {
        Self {
            id,
            target,
            stop,
            aggregate,
        }
    }

    /// Runs until the stop signal is observed between attempts, then adds
    /// the local count to the aggregate exactly once.
    pub async fn run(self) -> LoadResult {
        let mut result = LoadResult {
            worker_id: self.id,
            ..Default::default()
        };

        while !self.stop.is_stopped() {
            match self.target.attempt().await {
                AttemptOutcome::Success => result.attempted_count += 1,
                AttemptOutcome::Refused => result.failures.refused += 1,
                AttemptOutcome::Reset => result.failures.reset += 1,
                AttemptOutcome::TimedOut => result.failures.timed_out += 1,
                AttemptOutcome::Other(reason) => {
                    debug!("Worker {} attempt failed: {}", self.id, reason);
                    result.failures.other += 1;
                }
            }
            // attempts that never suspend must not starve the controller
            tokio::task::yield_now().await;
        }

        self.aggregate.add(result.attempted_count);
        debug!(
            "Worker {} stopped: {} completed, {} failed",
            self.id,
            result.attempted_count,
            result.failures.total()
        );
        result
    }
}
