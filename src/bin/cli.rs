//! CLI for the minipoints front-end

use clap::{Parser, Subcommand};
use minipoints::common::{encode_email, Error, FaultBody};
use minipoints::frontend::http::{BalanceReply, PingReply};
use minipoints::replica::http::{InitRequest, PingRequest, PointsRequest};

#[derive(Parser)]
#[command(name = "minipoints")]
#[command(about = "minipoints points-balance CLI")]
#[command(version)]
struct Cli {
    /// Front-end URL
    #[arg(long, default_value = "http://localhost:8080")]
    frontend: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Activate an account on every replica
    Activate { email: String },

    /// Show the freshest balance
    Balance { email: String },

    /// Add points
    Add { email: String, points: i64 },

    /// Spend points
    Spend { email: String, points: i64 },

    /// Ping every replica
    Ping {
        #[arg(default_value = "")]
        message: String,
    },

    /// Drop all accounts on every replica
    Clear,

    /// Set the initial balance for new accounts
    Init {
        #[arg(allow_hyphen_values = true)]
        initial_balance: i64,
    },
}

/// Turn an error response into a typed error
async fn fail(resp: reqwest::Response) -> anyhow::Error {
    let status = resp.status();
    match resp.json::<FaultBody>().await {
        Ok(body) => Error::from_fault_body(body).into(),
        Err(_) => anyhow::anyhow!("front-end answered {}", status),
    }
}

fn print_update(reply: &BalanceReply) {
    match (reply.acknowledged, reply.replicas) {
        (Some(acked), Some(total)) => println!(
            "Update not fully replicated ({}/{} replicas acknowledged), balance: {}",
            acked, total, reply.balance
        ),
        _ => println!("{}: {} points", reply.email, reply.balance),
    }
}

async fn update(
    http: &reqwest::Client,
    base: &str,
    op: &str,
    email: &str,
    points: i64,
) -> anyhow::Result<()> {
    let resp = http
        .post(format!("{}/users/{}/{}", base, encode_email(email), op))
        .json(&PointsRequest { points })
        .send()
        .await?;
    let status = resp.status();
    if !status.is_success() && status != reqwest::StatusCode::SERVICE_UNAVAILABLE {
        return Err(fail(resp).await);
    }
    match resp.json::<BalanceReply>().await {
        Ok(reply) => print_update(&reply),
        Err(_) => anyhow::bail!("front-end answered {}", status),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let base = cli.frontend.trim_end_matches('/');
    let http = reqwest::Client::new();

    match cli.command {
        Commands::Activate { email } => {
            let resp = http
                .post(format!("{}/users/{}", base, encode_email(&email)))
                .send()
                .await?;
            if !resp.status().is_success() {
                return Err(fail(resp).await);
            }
            println!("Activated {}", email);
        }

        Commands::Balance { email } => {
            let resp = http
                .get(format!("{}/users/{}", base, encode_email(&email)))
                .send()
                .await?;
            if !resp.status().is_success() {
                return Err(fail(resp).await);
            }
            let reply: BalanceReply = resp.json().await?;
            println!("{}: {} points", reply.email, reply.balance);
        }

        Commands::Add { email, points } => {
            update(&http, base, "add", &email, points).await?;
        }

        Commands::Spend { email, points } => {
            update(&http, base, "spend", &email, points).await?;
        }

        Commands::Ping { message } => {
            let resp = http
                .post(format!("{}/ctrl/ping", base))
                .json(&PingRequest { message })
                .send()
                .await?;
            if !resp.status().is_success() {
                return Err(fail(resp).await);
            }
            let reply: PingReply = resp.json().await?;
            println!("{}", reply.message);
        }

        Commands::Clear => {
            let resp = http.post(format!("{}/ctrl/clear", base)).send().await?;
            if !resp.status().is_success() {
                return Err(fail(resp).await);
            }
            println!("All replicas cleared");
        }

        Commands::Init { initial_balance } => {
            let resp = http
                .post(format!("{}/ctrl/init", base))
                .json(&InitRequest { initial_balance })
                .send()
                .await?;
            if !resp.status().is_success() {
                return Err(fail(resp).await);
            }
            println!("Initial balance set to {}", initial_balance);
        }
    }

    Ok(())
}
