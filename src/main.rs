//! request-shield
//!
//! Serves the demo application behind the request protection pipeline.
//!
//! # Architecture Overview
//!
//! ```text
//!  Client ──▶ request id ─▶ metrics ─▶ CSP ─▶ translator ─▶ allowlist
//!                                                               │
//!                                                               ▼
//!  Client ◀── (encrypted) response ◀── payload ◀── rate ◀── SQLi ◀── XSS
//!                                        │          limit
//!                                        ▼
//!                                     handler
//! ```

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;

use request_shield::config::{self, Environment, ShieldConfig};
use request_shield::crypto::{Keyring, StaticKeyProvider};
use request_shield::http::handlers::demo_router;
use request_shield::lifecycle::reload::reload_keys_on_hangup;
use request_shield::observability::{logging, metrics};
use request_shield::{Pipeline, ShieldServer, Shutdown};

const DEFAULT_CONFIG: &str = "shield.toml";

#[derive(Parser)]
#[command(name = "request-shield")]
#[command(about = "Request protection pipeline in front of a demo application", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./shield.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured environment
    #[arg(short, long)]
    environment: Option<Environment>,

    /// Override the listener bind address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .or_else(|| Path::new(DEFAULT_CONFIG).exists().then(|| PathBuf::from(DEFAULT_CONFIG)));
    let mut config = match &config_path {
        Some(path) => config::load_config(path)?,
        None => ShieldConfig::default(),
    };
    if let Some(environment) = cli.environment {
        config.environment = environment;
    }
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    config::validation::validate_config(&config).map_err(config::ConfigError::Validation)?;

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.environment,
        bind_address = %config.listener.bind_address,
        token_format = ?config.codec.format,
        rate_limiting = config.rate_limiting.enabled,
        "request-shield starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    let keyring = Keyring::from_config(&config.codec, |name| std::env::var(name).ok())?;
    let keys = Arc::new(StaticKeyProvider::new(keyring));
    tokio::spawn(reload_keys_on_hangup(
        keys.clone(),
        config_path,
        config.codec.clone(),
        shutdown.subscribe(),
    ));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let pipeline = Pipeline::new(config, keys)?;
    let server = ShieldServer::new(&pipeline, demo_router());

    tokio::spawn(shutdown.clone().trigger_on_signal());

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
