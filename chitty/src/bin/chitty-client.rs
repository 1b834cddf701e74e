//! Interactive ChittyChat client
//!
//! Prints every broadcast message with the local Lamport time and publishes
//! each line typed on stdin.

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use chitty_api::ChatClient;
use chitty_core::{logging, LoggingConfig};

#[derive(Parser, Debug)]
#[command(name = "chitty-client")]
#[command(about = "ChittyChat client", long_about = None)]
struct Args {
    /// Name shown to other participants
    #[arg(long, env = "CHITTY_CLIENT_NAME", default_value = "default")]
    name: String,

    /// Server address
    #[arg(long, env = "CHITTY_CLIENT_SERVER", default_value = "127.0.0.1:5400")]
    server: String,

    /// Log level
    #[arg(long, env = "CHITTY_CLIENT_LOG", default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_logging(&LoggingConfig {
        level: args.log_level.clone(),
        ..LoggingConfig::default()
    })?;

    info!(client_name = %args.name, server = %args.server, "Connecting");
    let client = ChatClient::connect(&args.server, args.name.clone()).await?;
    let mut subscription = client.subscribe().await?;

    let receiver = tokio::spawn(async move {
        loop {
            match subscription.next().await {
                Ok(Some(received)) => println!(
                    "\"{}\" from {} (server time {}, local time {})",
                    received.message.body(),
                    received.message.sender(),
                    received.message.timestamp(),
                    received.local_time
                ),
                Ok(None) => {
                    warn!("Server closed the stream");
                    break;
                }
                Err(e) => {
                    error!("Subscription failed: {}", e);
                    break;
                }
            }
        }
    });

    println!("Type the message you wish to send here");
    println!("--------------------");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match client.publish(line).await {
                    Ok(ack) => info!(
                        server_name = %ack.server_name,
                        timestamp = ack.timestamp,
                        "Message accepted"
                    ),
                    Err(e) => error!("Publish failed: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    receiver.abort();
    Ok(())
}
