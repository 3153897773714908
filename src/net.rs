use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time;
use tracing::debug;

/// How a connection attempt failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("connection refused")]
    Refused,
    #[error("connection reset")]
    Reset,
    #[error("timed out")]
    TimedOut,
    #[error("{kind:?}: {message}")]
    Other { kind: io::ErrorKind, message: String },
}

impl From<io::Error> for ConnectionError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::ConnectionRefused => ConnectionError::Refused,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => ConnectionError::Reset,
            io::ErrorKind::TimedOut => ConnectionError::TimedOut,
            kind => ConnectionError::Other {
                kind,
                message: e.to_string(),
            },
        }
    }
}

impl From<time::error::Elapsed> for ConnectionError {
    fn from(_: time::error::Elapsed) -> Self {
        ConnectionError::TimedOut
    }
}

/// Connects to `addr`, giving up after `timeout`.
pub async fn connect(addr: &str, timeout: Duration) -> Result<TcpStream, ConnectionError> {
    let stream = time::timeout(timeout, TcpStream::connect(addr)).await??;
    stream.set_nodelay(true)?;
    debug!("Connected to {}", addr);
    Ok(stream)
}
