use anyhow::Result;
use futures::future::join_all;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Echo backend for running behind the proxy under test. Listens on every
/// port given on the command line (default 8081 8082).
#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut ports: Vec<u16> = std::env::args()
        .skip(1)
        .map(|p| p.parse::<u16>())
        .collect::<Result<_, _>>()?;
    if ports.is_empty() {
        ports = vec![8081, 8082];
    }

    join_all(ports.into_iter().map(serve)).await;
    Ok(())
}

async fn serve(port: u16) {
    let listener = match TcpListener::bind(("127.0.0.1", port)).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind port {}: {}", port, e);
            return;
        }
    };
    info!("Echo server listening on port {}", port);

    loop {
        match listener.accept().await {
            Ok((socket, addr)) => {
                debug!("Connected by {} on port {}", addr, port);
                tokio::spawn(async move {
                    if let Err(e) = handle_client(socket).await {
                        debug!("Client {} ended with error: {}", addr, e);
                    }
                });
            }
            Err(e) => error!("Failed to accept on port {}: {}", port, e),
        }
    }
}

async fn handle_client(mut socket: TcpStream) -> std::io::Result<()> {
    let mut buf = vec![0u8; 1024];

    loop {
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        socket.write_all(&buf[..n]).await?;
    }

    Ok(())
}
