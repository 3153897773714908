//! Single-shot PROXY protocol verifier: accept one connection, read once,
//! decode, report, close.

use socket2::{Domain, Protocol, Socket, Type};
use std::fmt;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::time;
use tracing::{debug, info, warn};

use crate::config::ListenerConfig;
use crate::error::{HarnessError, Result};
use crate::proxy_protocol::{self, Decoded};

pub struct ListenerProbe {
    listener: TcpListener,
    local_addr: SocketAddr,
    read_buffer_size: usize,
    expected_source_ip: Ipv4Addr,
    accept_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct VerificationReport {
    pub peer: SocketAddr,
    pub bytes_read: usize,
    pub decoded: Decoded,
}

impl VerificationReport {
    pub fn passed(&self) -> bool {
        self.decoded.is_clean()
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Accepted connection from {}", self.peer)?;
        writeln!(f, "Read {} bytes", self.bytes_read)?;
        for finding in &self.decoded.findings {
            let verdict = if finding.is_ok() { "SUCCESS" } else { "FAILURE" };
            writeln!(f, "{}: {}", verdict, finding)?;
        }
        if let Some(len) = self.decoded.header.address_length {
            writeln!(f, "Address Length: {}", len)?;
        }
        if let Some(addrs) = self.decoded.header.addresses {
            writeln!(f, "Source: {}", addrs.source())?;
            writeln!(f, "Dest: {}", addrs.dest())?;
        }
        Ok(())
    }
}

impl ListenerProbe {
    /// Binds the listening socket. Failure here is fatal and not retried.
    pub async fn bind(config: &ListenerConfig) -> Result<Self> {
        let addr = config.listen_addr;
        let listener = bind_reuse(addr).map_err(|source| HarnessError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;
        info!("Listening on {}...", local_addr);

        Ok(Self {
            listener,
            local_addr,
            read_buffer_size: config.read_buffer_size,
            expected_source_ip: config.expected_source_ip,
            accept_timeout: config.accept_timeout_seconds.map(Duration::from_secs),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts exactly one connection and verifies the first read from it.
    /// The connection and the listener are both closed on return.
    pub async fn run(self) -> Result<VerificationReport> {
        let accepted = match self.accept_timeout {
            Some(timeout) => time::timeout(timeout, self.listener.accept())
                .await
                .map_err(|_| HarnessError::AcceptTimeout {
                    addr: self.local_addr,
                    timeout,
                })?,
            None => self.listener.accept().await,
        };
        let (mut conn, peer) = accepted?;
        info!("Accepted connection from {}", peer);

        let mut buf = vec![0u8; self.read_buffer_size];
        let bytes_read = conn.read(&mut buf).await?;
        if bytes_read == 0 {
            warn!("Peer {} closed before sending anything", peer);
        } else {
            debug!("Read {} bytes from {}", bytes_read, peer);
        }

        let mut decoded = proxy_protocol::decode(&buf[..bytes_read]);
        decoded.check_source_ip(self.expected_source_ip);

        Ok(VerificationReport {
            peer,
            bytes_read,
            decoded,
        })
    }
}

fn bind_reuse(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1)?;
    socket.set_nonblocking(true)?;
    TcpListener::from_std(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy_protocol::{Check, Finding, SIGNATURE};
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    fn config() -> ListenerConfig {
        ListenerConfig {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            accept_timeout_seconds: Some(5),
            ..Default::default()
        }
    }

    fn loopback_header() -> Vec<u8> {
        let mut buf = SIGNATURE.to_vec();
        buf.extend_from_slice(&[0x21, 0x11, 0x00, 0x0C]);
        buf.extend_from_slice(&[127, 0, 0, 1, 127, 0, 0, 1]);
        buf.extend_from_slice(&8080u16.to_be_bytes());
        buf.extend_from_slice(&8081u16.to_be_bytes());
        buf
    }

    #[tokio::test]
    async fn test_verifies_valid_header() {
        let probe = ListenerProbe::bind(&config()).await.unwrap();
        let addr = probe.local_addr();

        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream.write_all(&loopback_header()).await.unwrap();
            stream
        });

        let report = probe.run().await.unwrap();
        let _stream = client.await.unwrap();

        assert_eq!(report.bytes_read, 28);
        assert!(report.passed());
        assert_eq!(
            report.decoded.findings.last(),
            Some(&Finding::Ok(Check::SourceIp))
        );

        let text = report.to_string();
        assert!(text.contains("Source: 127.0.0.1:8080"));
        assert!(text.contains("Dest: 127.0.0.1:8081"));
        assert!(!text.contains("FAILURE"));
    }

    #[tokio::test]
    async fn test_reports_mismatched_source_ip() {
        let mut cfg = config();
        cfg.expected_source_ip = Ipv4Addr::new(10, 0, 0, 1);
        let probe = ListenerProbe::bind(&cfg).await.unwrap();
        let addr = probe.local_addr();

        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream.write_all(&loopback_header()).await.unwrap();
            stream
        });

        let report = probe.run().await.unwrap();
        let _stream = client.await.unwrap();

        assert!(!report.passed());
        assert!(report.to_string().contains("FAILURE: source ip mismatch"));
    }

    #[tokio::test]
    async fn test_peer_closing_early_is_signature_mismatch() {
        let probe = ListenerProbe::bind(&config()).await.unwrap();
        let addr = probe.local_addr();

        let client = tokio::spawn(async move {
            let stream = TcpStream::connect(addr).await.unwrap();
            drop(stream);
        });

        let report = probe.run().await.unwrap();
        client.await.unwrap();

        assert_eq!(report.bytes_read, 0);
        assert_eq!(
            report.decoded.findings,
            vec![Finding::SignatureMismatch { received: vec![] }]
        );
    }

    #[tokio::test]
    async fn test_bind_in_use_is_fatal() {
        let held = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let mut cfg = config();
        cfg.listen_addr = held.local_addr().unwrap();

        let err = ListenerProbe::bind(&cfg).await.err().unwrap();
        assert!(matches!(err, HarnessError::Bind { .. }));
    }

    #[tokio::test]
    async fn test_accept_timeout() {
        let mut cfg = config();
        cfg.accept_timeout_seconds = Some(0);
        let probe = ListenerProbe::bind(&cfg).await.unwrap();

        let err = probe.run().await.unwrap_err();
        assert!(matches!(err, HarnessError::AcceptTimeout { .. }));
    }
}
