use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use flux_harness::bandwidth;
use flux_harness::config::Config;
use flux_harness::listener::ListenerProbe;
use flux_harness::load::{BenchmarkController, TcpTarget};
use flux_harness::probe;
use flux_harness::request;

#[derive(Parser, Debug)]
#[command(name = "flux-harness")]
#[command(version, about = "Load, PROXY protocol and availability checks for a TCP proxy", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Target host (overrides [target].host)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Target port (overrides [target].port)
    #[arg(short, long, global = true)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Accept one connection and verify its PROXY protocol v2 header
    Verify {
        #[arg(short, long)]
        listen: Option<SocketAddr>,
        #[arg(long)]
        expected_source_ip: Option<Ipv4Addr>,
    },
    /// Run a fixed-duration connection benchmark against the target
    Bench {
        #[arg(short, long)]
        workers: Option<usize>,
        #[arg(short, long)]
        duration: Option<u64>,
    },
    /// Check that a port with no listener refuses rather than drops
    Probe {
        /// Port to probe (overrides [probe].port)
        #[arg(long)]
        probe_port: Option<u16>,
    },
    /// Time an echo of a large payload through the target
    Bandwidth {
        #[arg(short, long)]
        size: Option<usize>,
    },
    /// Send a few one-shot requests with a pause between them
    Requests {
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },
    /// Send one request to each port concurrently
    Ports {
        #[arg(required = true)]
        ports: Vec<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(&path.to_string_lossy())?,
        None => Config::default(),
    };
    if let Some(host) = cli.host.clone() {
        config.target.host = host;
    }
    if let Some(port) = cli.port {
        config.target.port = port;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Command::Verify {
            listen,
            expected_source_ip,
        } => {
            if let Some(listen) = listen {
                config.listener.listen_addr = listen;
            }
            if let Some(ip) = expected_source_ip {
                config.listener.expected_source_ip = ip;
            }
            config.validate()?;

            let probe = ListenerProbe::bind(&config.listener).await?;
            println!("Listening on {}...", probe.local_addr());
            let report = probe.run().await?;
            print!("{}", report);
        }
        Command::Bench { workers, duration } => {
            if let Some(workers) = workers {
                config.benchmark.workers = workers;
            }
            if let Some(duration) = duration {
                config.benchmark.duration_seconds = duration;
            }
            config.validate()?;

            let target = TcpTarget::new(
                config.target.addr(),
                config.benchmark.payload.clone().into_bytes(),
                config.benchmark.attempt_timeout(),
            );
            info!("Benchmarking {}", target.addr());
            println!(
                "Starting benchmark with {} workers for {} seconds...",
                config.benchmark.workers, config.benchmark.duration_seconds
            );
            let controller = BenchmarkController::new(
                target,
                config.benchmark.workers,
                config.benchmark.duration(),
            )?;
            let summary = controller.run().await;
            println!("{}", summary);
        }
        Command::Probe { probe_port } => {
            let port = probe_port.unwrap_or(config.probe.port);
            let addr = format!("{}:{}", config.target.host, port);
            let report = probe::probe(&addr, Duration::from_millis(config.probe.timeout_ms)).await;
            println!("{}", report.verdict);
            if !report.verdict.is_healthy_closed_port() {
                std::process::exit(1);
            }
        }
        Command::Bandwidth { size } => {
            let size = size.unwrap_or(config.bandwidth.size_bytes);
            let report = bandwidth::measure(
                &config.target.addr(),
                size,
                config.benchmark.attempt_timeout(),
            )
            .await?;
            println!("{}", report);
        }
        Command::Requests { count, interval_ms } => {
            println!("Sending {} requests...", count);
            let results = request::sequential_requests(
                &config.target.addr(),
                count,
                Duration::from_millis(interval_ms),
                config.benchmark.attempt_timeout(),
                config.benchmark.payload.as_bytes(),
            )
            .await;
            for result in results {
                println!("{}", result);
            }
        }
        Command::Ports { ports } => {
            println!("Starting concurrent requests...");
            let results = request::concurrent_port_requests(
                &config.target.host,
                &ports,
                config.benchmark.attempt_timeout(),
            )
            .await;
            for result in results {
                println!("{}", result);
            }
            println!("Test complete.");
        }
    }

    Ok(())
}
