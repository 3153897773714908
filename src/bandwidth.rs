use std::fmt;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info};

use crate::net::{self, ConnectionError};

#[derive(Debug, Clone, PartialEq)]
pub struct BandwidthReport {
    pub sent: usize,
    pub received: usize,
    pub elapsed_seconds: f64,
    pub megabytes_per_second: f64,
}

impl fmt::Display for BandwidthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Received {} of {} bytes in {:.2} seconds.",
            self.received, self.sent, self.elapsed_seconds
        )?;
        write!(f, "Speed: {:.2} MB/s", self.megabytes_per_second)
    }
}

/// Sends `size_bytes` through an echoing path and times how long the echo
/// takes to come back. A throttled proxy shows up as a low MB/s figure.
pub async fn measure(
    addr: &str,
    size_bytes: usize,
    connect_timeout: Duration,
) -> Result<BandwidthReport, ConnectionError> {
    info!("Connecting to {}...", addr);
    let stream = net::connect(addr, connect_timeout).await?;
    let (mut reader, mut writer) = stream.into_split();

    let payload = vec![b'A'; size_bytes];
    info!("Sending {} bytes...", size_bytes);
    let start = Instant::now();

    // write on its own task so a small echo buffer can't deadlock the exchange
    let sender = tokio::spawn(async move {
        writer.write_all(&payload).await?;
        Ok::<_, std::io::Error>(writer)
    });

    let mut received = 0;
    let mut buf = vec![0u8; 4096];
    while received < size_bytes {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            debug!("Peer closed after {} bytes", received);
            break;
        }
        received += n;
    }
    let elapsed = start.elapsed().as_secs_f64();

    match sender.await {
        Ok(result) => drop(result?),
        Err(e) => debug!("Bandwidth sender task failed: {}", e),
    }

    let megabytes_per_second = if elapsed > 0.0 {
        received as f64 / elapsed / 1024.0 / 1024.0
    } else {
        0.0
    };

    Ok(BandwidthReport {
        sent: size_bytes,
        received,
        elapsed_seconds: elapsed,
        megabytes_per_second,
    })
}
