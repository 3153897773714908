use futures::future::join_all;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time;
use tracing::debug;

use crate::net::{self, ConnectionError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestResult {
    Response(Vec<u8>),
    Failed(ConnectionError),
}

impl fmt::Display for RequestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestResult::Response(data) if data.is_empty() => write!(f, "Response: Empty"),
            RequestResult::Response(data) => {
                write!(f, "Response: {}", String::from_utf8_lossy(data))
            }
            RequestResult::Failed(e) => write!(f, "Request failed: {}", e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PortResult {
    pub port: u16,
    pub result: RequestResult,
    pub elapsed: Duration,
}

impl fmt::Display for PortResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            RequestResult::Response(data) => write!(
                f,
                "Port {}: Received {} (completed in {:.4}s)",
                self.port,
                String::from_utf8_lossy(data),
                self.elapsed.as_secs_f64()
            ),
            RequestResult::Failed(e) => write!(f, "Port {}: Error - {}", self.port, e),
        }
    }
}

/// One connect, send, single read. The whole exchange shares `timeout`.
pub async fn send_request(addr: &str, payload: &[u8], timeout: Duration) -> RequestResult {
    let exchange = async {
        let mut stream = net::connect(addr, timeout).await?;
        stream.write_all(payload).await?;
        let mut buf = vec![0u8; 1024];
        let n = stream.read(&mut buf).await?;
        buf.truncate(n);
        Ok::<_, ConnectionError>(buf)
    };

    match time::timeout(timeout, exchange).await {
        Ok(Ok(data)) => RequestResult::Response(data),
        Ok(Err(e)) => RequestResult::Failed(e),
        Err(elapsed) => RequestResult::Failed(elapsed.into()),
    }
}

/// Sends `count` requests one after another with `interval` between them.
/// Used to watch a balancer fail over while backends are taken down.
pub async fn sequential_requests(
    addr: &str,
    count: usize,
    interval: Duration,
    timeout: Duration,
    payload: &[u8],
) -> Vec<RequestResult> {
    let mut results = Vec::with_capacity(count);
    for i in 0..count {
        if i > 0 {
            time::sleep(interval).await;
        }
        let result = send_request(addr, payload, timeout).await;
        debug!("Request {} to {}: {}", i + 1, addr, result);
        results.push(result);
    }
    results
}

/// Hits every port concurrently with a `Hello from <port>` message.
pub async fn concurrent_port_requests(
    host: &str,
    ports: &[u16],
    timeout: Duration,
) -> Vec<PortResult> {
    let requests = ports.iter().map(|&port| async move {
        let addr = format!("{}:{}", host, port);
        let message = format!("Hello from {}", port);
        let start = Instant::now();
        let result = send_request(&addr, message.as_bytes(), timeout).await;
        PortResult {
            port,
            result,
            elapsed: start.elapsed(),
        }
    });
    join_all(requests).await
}
