use anyhow::Context;
use clap::Parser;
use common::{get_tcp_listener, init_tracing, DEFAULT_PORT};
use speed::{Application, Config};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Parser)]
#[command(version, about = "Speed Daemon: average speed enforcement over TCP")]
struct Args {
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    host: IpAddr,
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
    /// Seconds between retries of every undelivered ticket.
    #[arg(long)]
    sweep_interval: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let listener = get_tcp_listener(args.host, args.port)
        .await
        .with_context(|| format!("Could not listen on {}:{}", args.host, args.port))?;
    let config = Config {
        sweep_interval: args.sweep_interval.map(Duration::from_secs),
    };

    tokio::select! {
        _ = Arc::new(Application::new(config)).run(listener) => {},
        result = tokio::signal::ctrl_c() => {
            result.context("Could not listen for shutdown signal")?;
            info!("Shutting down.");
        }
    }
    Ok(())
}
