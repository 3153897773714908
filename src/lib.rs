//! Test and measurement harness for a TCP proxy or load balancer.
//!
//! Everything here talks to the service under test from the outside: load
//! generation, PROXY protocol v2 verification, and availability probes.

pub mod bandwidth;
pub mod config;
pub mod error;
pub mod listener;
pub mod load;
pub mod net;
pub mod probe;
pub mod proxy_protocol;
pub mod request;

pub use error::{HarnessError, Result};
