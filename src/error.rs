use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("no connection accepted on {addr} within {timeout:?}")]
    AcceptTimeout { addr: SocketAddr, timeout: Duration },
    #[error("invalid benchmark: {0}")]
    InvalidBenchmark(String),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HarnessError>;
