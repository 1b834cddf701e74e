use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use chitty_core::{logging, Config, LamportClock};
use chitty_hub::{Broadcaster, SubscriptionRegistry};

#[derive(Parser, Debug)]
#[command(name = "chitty-server")]
#[command(about = "ChittyChat broadcast server", long_about = None)]
struct Args {
    /// Config file (YAML or TOML)
    #[arg(long, env = "CHITTY_CONFIG_PATH")]
    config: Option<String>,

    /// Server display name returned in publish acknowledgments
    #[arg(long)]
    name: Option<String>,

    /// Listen host
    #[arg(long)]
    host: Option<String>,

    /// Listen port
    #[arg(long)]
    port: Option<u16>,
}

fn load_config(args: &Args) -> Result<Config> {
    let path = args.config.clone().or_else(Config::default_path);
    if let Some(path) = &path {
        eprintln!("Loading config from {path}");
    }

    let mut config = Config::load(path.as_deref())?;

    if let Some(name) = &args.name {
        config.server.name.clone_from(name);
    }
    if let Some(host) = &args.host {
        config.server.host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("Config validation error: {e}");
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s)",
            errors.len()
        ));
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Configuration
    let config = load_config(&args)?;

    // 2. Logging
    logging::init_logging(&config.logging)?;
    info!(
        server_name = %config.server.name,
        address = %config.grpc_address(),
        "ChittyChat server starting"
    );

    // 3. Shared ordering and fan-out state
    let clock = Arc::new(LamportClock::new());
    let registry = Arc::new(SubscriptionRegistry::from_config(&config.hub));
    let broadcaster = Arc::new(Broadcaster::new(clock, registry));

    // 4. Ctrl-C stops accepting and tears every session down
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown signal received");
                    shutdown.cancel();
                }
                Err(e) => error!("Failed to listen for shutdown signal: {}", e),
            }
        }
    });

    // 5. Serve
    if let Err(e) = chitty_api::serve(&config, broadcaster.clone(), shutdown).await {
        error!("Server error: {}", e);
        return Err(e);
    }

    let stats = broadcaster.stats();
    info!(
        broadcasts = stats.broadcasts,
        delivered = stats.delivered,
        dropped = stats.dropped,
        "ChittyChat server stopped"
    );

    Ok(())
}
