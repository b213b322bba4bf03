//! trusthub-server - TrustHub API server.
//!
//! Serves the HTTP API and runs the reconciliation service and the store
//! health monitor until interrupted.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trust_gateway::{RemoteProofVerifier, ServerConfig, TrustHubServer};

#[derive(Parser)]
#[command(name = "trusthub-server")]
#[command(about = "TrustHub review platform API server")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, env = "TRUSTHUB_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "TRUSTHUB_BIND")]
    bind: Option<SocketAddr>,

    /// Directory for persisted state
    #[arg(long, env = "TRUSTHUB_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Session signing secret (at least 32 bytes)
    #[arg(long, env = "TRUSTHUB_SESSION_SECRET", hide_env_values = true)]
    session_secret: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::read(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config = config.with_bind_addr(bind);
    }
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(secret) = &cli.session_secret {
        config = config.with_session_secret(secret);
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = load_config(&cli)?;
    let addr = config.server.bind_addr;
    info!(
        addr = %addr,
        environment = %config.server.environment,
        persisted = config.server.data_dir.is_some(),
        "starting trusthub-server"
    );

    let verifier = RemoteProofVerifier::new(&config.identity);
    let server = TrustHubServer::new(config, verifier);
    server.start_background().await?;

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
        }
    };
    let result = server.serve_with_shutdown(addr, shutdown).await;
    server.stop_background();
    result?;
    Ok(())
}
