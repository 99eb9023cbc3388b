//! Front-end binary

use clap::{Parser, Subcommand};
use minipoints::common::{parse_registry_entry, Config, FanOutMode, RegistryEntry};
use minipoints::FrontEnd;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "minipoints-front")]
#[command(about = "minipoints front-end coordinating the replica set")]
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
    /// Start front-end server
    Serve {
        /// Bind address for the public HTTP API
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Replica name prefix
        #[arg(long)]
        service_name: Option<String>,

        /// Number of replicas
        #[arg(long)]
        replicas: Option<usize>,

        /// Replica registry entries, name=url (comma-separated)
        #[arg(long, value_delimiter = ',')]
        registry: Vec<String>,

        /// Per-call timeout towards a replica (milliseconds)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// sequential or parallel
        #[arg(long)]
        fan_out: Option<FanOutMode>,
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
            bind,
            service_name,
            replicas,
            registry,
            timeout_ms,
            fan_out,
        } => {
            let mut front_config = config.frontend;
            if let Some(bind) = bind {
                front_config.bind_addr = bind;
            }
            if let Some(service_name) = service_name {
                front_config.service_name = service_name;
            }
            if let Some(replicas) = replicas {
                front_config.replicas = replicas;
            }
            if let Some(timeout_ms) = timeout_ms {
                front_config.request_timeout_ms = timeout_ms;
            }
            if let Some(fan_out) = fan_out {
                front_config.fan_out = fan_out;
            }
            for entry in &registry {
                let (name, url) = parse_registry_entry(entry)?;
                front_config.registry.retain(|e| e.name != name);
                front_config.registry.push(RegistryEntry { name, url });
            }

            FrontEnd::new(front_config).serve().await?;
        }
    }

    Ok(())
}
