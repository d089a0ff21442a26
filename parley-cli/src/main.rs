use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use parley_server::RelayConfig;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "parley=info,parley_server=info,tower_http=info";

#[derive(Parser)]
#[command(name = "parley", version, about = "WebRTC signaling relay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay. Flags override PARLEY_* environment variables.
    Serve(ServeArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Listener address, e.g. 0.0.0.0:8080
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Drop connections that stay silent this long
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    idle_timeout_secs: Option<u64>,

    /// Answer messages for absent users with a leave notice
    #[arg(long)]
    notify_unreachable: bool,
}

impl ServeArgs {
    fn apply(self, mut config: RelayConfig) -> RelayConfig {
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(secs) = self.idle_timeout_secs {
            config.idle_timeout = Duration::from_secs(secs);
        }
        if self.notify_unreachable {
            config.notify_unreachable = true;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve(args) => {
            let config = args.apply(RelayConfig::from_env().context("Invalid PARLEY_* environment")?);

            println!("{}", "📡 Starting parley relay...".green().bold());
            println!("   🔌 Listening:    ws://{}/ws", config.bind_addr);
            println!("   ⏱  Idle timeout: {}s", config.idle_timeout.as_secs());
            if config.notify_unreachable {
                println!("   {}", "Absent targets are reported back to senders".cyan());
            }

            info!(
                bind = %config.bind_addr,
                idle_timeout_secs = config.idle_timeout.as_secs(),
                notify_unreachable = config.notify_unreachable,
                "Configuration loaded"
            );

            parley_server::serve(config).await?;
            println!("{}", "✨ Relay stopped".green().bold());
        }
    }

    Ok(())
}
