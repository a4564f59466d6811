//! `signin`: terminal front end of the QR sign-in client

use anyhow::{Context, Result};
use clap::Parser;
use common::{ClientConfig, LocalStorage, SessionStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod args;
mod commands;
mod render;

use crate::args::CliArgs;
use crate::commands::App;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let mut config =
        ClientConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    args.apply(&mut config);

    init_logging(&config.log_level);
    info!("Using storage at {}", config.storage_path.display());

    let storage = LocalStorage::open(&config.storage_path)
        .await
        .with_context(|| format!("failed to open {}", config.storage_path.display()))?;
    let store = SessionStore::new(storage);
    let session = store.load().await.context("failed to load session")?;

    if session.api_endpoint().is_empty() {
        if let Some(endpoint) = &config.default_endpoint {
            info!("Using default endpoint {}", endpoint);
            session.set_api_endpoint(endpoint.as_str());
        }
    }

    App::new(config, store, session).run(args.command).await
}

/// Log to stderr so command output stays clean on stdout
fn init_logging(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
