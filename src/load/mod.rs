//! Fixed-duration load generation.
//!
//! A [`BenchmarkController`] spawns N [`LoadWorker`]s which hammer a
//! [`Target`] until a shared [`StopSignal`] fires. Each worker adds its local
//! count to the shared [`AggregateCount`] once, on the way out.

mod controller;
mod signal;
mod worker;

pub use controller::{BenchmarkController, BenchmarkSummary};
pub use signal::{AggregateCount, StopSignal};
pub use worker::{AttemptOutcome, FailureTally, LoadResult, LoadWorker, Target, TcpTarget};
