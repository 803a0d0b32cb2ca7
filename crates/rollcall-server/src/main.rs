//! Rollcall server binary.
//!
//! # Usage
//!
//! ```bash
//! # Start on the default port
//! rollcall-server --bind 0.0.0.0:8080
//!
//! # Raise the connection limit and log verbosity
//! rollcall-server --bind 0.0.0.0:8080 --max-connections 50000 --log-level debug
//! ```

use std::time::Duration;

use clap::Parser;
use rollcall_server::{DriverConfig, Server, ServerRuntimeConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Rollcall presence server
#[derive(Parser, Debug)]
#[command(name = "rollcall-server")]
#[command(about = "Rollcall namespace presence server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    bind: String,

    /// Maximum concurrent connections
    #[arg(long, default_value = "10000")]
    max_connections: usize,

    /// Seconds allowed for a client to complete its handshake
    #[arg(long, default_value = "30")]
    handshake_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Rollcall server starting");
    tracing::info!("Binding to {}", args.bind);

    let config = ServerRuntimeConfig {
        bind_address: args.bind,
        handshake_timeout: Duration::from_secs(args.handshake_timeout),
        driver: DriverConfig { max_connections: args.max_connections },
    };

    let server = Server::bind(config).await?;

    tracing::info!("Server listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}
