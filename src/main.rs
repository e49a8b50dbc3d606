//! Tank Arena Server
//!
//! Runs the authoritative arena behind a WebSocket gateway.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tank_arena::{
    network::{GameServer, ServerConfig},
    SEND_RATE, TICK_RATE, VERSION,
};

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(name = "tank-arena-server", version, about)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to listen on
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Simulation ticks per second
    #[arg(long, default_value_t = TICK_RATE)]
    tick_rate: u32,

    /// Snapshots per second (must divide the tick rate)
    #[arg(long, default_value_t = SEND_RATE)]
    send_rate: u32,

    /// Arena seed; drawn from the clock when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum concurrent connections
    #[arg(long, default_value_t = 64)]
    max_connections: usize,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .with_context(|| format!("invalid log level '{}'", args.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig {
        bind_addr: SocketAddr::new(args.host, args.port),
        max_connections: args.max_connections,
        tick_rate: args.tick_rate,
        send_rate: args.send_rate,
        seed: args.seed,
        ..ServerConfig::default()
    };
    config.validate().context("invalid server configuration")?;

    info!("Tank Arena Server v{}", VERSION);
    info!("Tick Rate: {} Hz, Send Rate: {} Hz", config.tick_rate, config.send_rate);

    let server = Arc::new(GameServer::new(config));

    let signal_server = server.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => signal_server.shutdown(),
            Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    server
        .run()
        .await
        .with_context(|| format!("server on {}:{} failed", args.host, args.port))?;

    info!("Server stopped");
    Ok(())
}
