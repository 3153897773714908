//! Availability probe for ports the service under test should not serve.
//!
//! A closed port ought to refuse (or reset) the connection straight away.
//! A connect that hangs until the timeout means packets are being silently
//! dropped, which is the failure this probe exists to surface.

use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::net::{self, ConnectionError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeVerdict {
    Refused,
    Reset,
    TimedOut,
    Connected,
    Other(String),
}

impl ProbeVerdict {
    pub fn is_healthy_closed_port(&self) -> bool {
        matches!(self, ProbeVerdict::Refused | ProbeVerdict::Reset)
    }
}

impl From<Result<(), ConnectionError>> for ProbeVerdict {
    fn from(result: Result<(), ConnectionError>) -> Self {
        match result {
            Ok(()) => ProbeVerdict::Connected,
            Err(ConnectionError::Refused) => ProbeVerdict::Refused,
            Err(ConnectionError::Reset) => ProbeVerdict::Reset,
            Err(ConnectionError::TimedOut) => ProbeVerdict::TimedOut,
            Err(other) => ProbeVerdict::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ProbeVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeVerdict::Refused => {
                write!(f, "Success: Connection Refused (correct behavior for closed port)")
            }
            ProbeVerdict::Reset => write!(f, "Success: Connection Reset (acceptable)"),
            ProbeVerdict::TimedOut => write!(f, "Failure: Connection Timed Out (silent drop)"),
            ProbeVerdict::Connected => {
                write!(f, "Failure: Connected, but no listener was expected")
            }
            ProbeVerdict::Other(reason) => write!(f, "Failure: {}", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub addr: String,
    pub verdict: ProbeVerdict,
    pub elapsed: Duration,
}

pub async fn probe(addr: &str, timeout: Duration) -> ProbeReport {
    info!("Connecting to {}...", addr);
    let start = Instant::now();
    let verdict = ProbeVerdict::from(net::connect(addr, timeout).await.map(|_stream| ()));
    let elapsed = start.elapsed();

    if verdict.is_healthy_closed_port() {
        debug!("Probe of {} returned {:?} in {:?}", addr, verdict, elapsed);
    } else {
        warn!("Probe of {} returned {:?} after {:?}", addr, verdict, elapsed);
    }

    ProbeReport {
        addr: addr.to_string(),
        verdict,
        elapsed,
    }
}
