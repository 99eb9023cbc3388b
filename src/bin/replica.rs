//! Replica binary

use clap::{Parser, Subcommand};
use minipoints::{common::Config, ReplicaServer};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "minipoints-replica")]
#[command(about = "minipoints replica holding one copy of every account")]
#[command(version)]
struct Cli {
    /// Config file (TOML)
    #[arg(long, default_value = "minipoints")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start replica server
    Serve {
        /// Logical replica name (e.g. Points1)
        #[arg(long)]
        name: Option<String>,

        /// Bind address for the RPC surface
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Initial balance for new accounts
        #[arg(long)]
        initial_balance: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config from file, then override with CLI arguments
    let config = Config::load_from(&cli.config)?;
    let log_level = cli.log_level.unwrap_or_else(|| config.log_level.clone());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Serve {
            name,
            bind,
            initial_balance,
        } => {
            let mut replica_config = config.replica;
            if let Some(name) = name {
                replica_config.name = name;
            }
            if let Some(bind) = bind {
                replica_config.bind_addr = bind;
            }
            if let Some(balance) = initial_balance {
                replica_config.initial_balance = balance;
            }

            let server = ReplicaServer::new(replica_config)?;
            server.serve().await?;
        }
    }

    Ok(())
}
