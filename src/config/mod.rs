use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub target: TargetConfig,
    pub benchmark: BenchmarkConfig,
    pub listener: ListenerConfig,
    pub probe: ProbeConfig,
    pub bandwidth: BandwidthConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TargetConfig {
    pub host: String,
    pub port: u16,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl TargetConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BenchmarkConfig {
    pub workers: usize,
    pub duration_seconds: u64,
    pub payload: String,
    pub attempt_timeout_ms: u64,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            duration_seconds: 10,
            payload: "PING".to_string(),
            attempt_timeout_ms: 2000,
        }
    }
}

impl BenchmarkConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_seconds)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    pub listen_addr: SocketAddr,
    pub read_buffer_size: usize,
    pub expected_source_ip: Ipv4Addr,
    pub accept_timeout_seconds: Option<u64>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 9096)),
            read_buffer_size: 1024,
            expected_source_ip: Ipv4Addr::LOCALHOST,
            accept_timeout_seconds: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProbeConfig {
    pub port: u16,
    pub timeout_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            port: 9000,
            timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BandwidthConfig {
    pub size_bytes: usize,
}

impl Default for BandwidthConfig {
    fn default() -> Self {
        Self {
            size_bytes: 100 * 1024,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "flux_harness=info,info".to_string(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.benchmark.workers == 0 {
            return Err(ConfigError::InvalidValue(
                "benchmark.workers must be at least 1".into(),
            ));
        }
        if self.benchmark.duration_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "benchmark.duration_seconds must be greater than 0".into(),
            ));
        }
        if self.benchmark.payload.is_empty() {
            return Err(ConfigError::InvalidValue(
                "benchmark.payload must not be empty".into(),
            ));
        }
        if self.benchmark.attempt_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "benchmark.attempt_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.listener.read_buffer_size == 0 {
            return Err(ConfigError::InvalidValue(
                "listener.read_buffer_size must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.target.addr(), "127.0.0.1:8080");
        assert_eq!(config.benchmark.workers, 8);
        assert_eq!(config.benchmark.duration(), Duration::from_secs(10));
        assert_eq!(config.benchmark.payload, "PING");
        assert_eq!(config.listener.read_buffer_size, 1024);
        assert_eq!(config.listener.listen_addr.port(), 9096);
        assert_eq!(config.probe.port, 9000);
        assert_eq!(config.bandwidth.size_bytes, 102400);
        assert_ok!(config.validate());
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml(
            r#"
            [target]
            port = 9999

            [benchmark]
            workers = 4
            duration_seconds = 1

            [listener]
            listen_addr = "0.0.0.0:7000"
            expected_source_ip = "10.0.0.1"
            "#,
        )
        .unwrap();

        assert_eq!(config.target.host, "127.0.0.1");
        assert_eq!(config.target.port, 9999);
        assert_eq!(config.benchmark.workers, 4);
        assert_eq!(config.benchmark.payload, "PING");
        assert_eq!(config.listener.listen_addr.port(), 7000);
        assert_eq!(config.listener.expected_source_ip, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(config.listener.read_buffer_size, 1024);
    }

    #[test]
    fn test_rejects_zero_workers() {
        let err = Config::from_toml("[benchmark]\nworkers = 0\n").unwrap_err();
        assert!(err.to_string().contains("benchmark.workers"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.benchmark.duration_seconds = 0;
        assert_err!(config.validate());

        let mut config = Config::default();
        config.benchmark.payload.clear();
        assert_err!(config.validate());

        let mut config = Config::default();
        config.listener.read_buffer_size = 0;
        assert_err!(config.validate());

        let mut config = Config::default();
        config.benchmark.attempt_timeout_ms = 0;
        assert_err!(config.validate());
    }
}
