//! `beacond`: runs a Beacon server from a JSON config file.
//!
//! ```text
//! beacond [config.json]
//! ```
//!
//! The config file is created with defaults if it doesn't exist. Log
//! verbosity follows `RUST_LOG` (default `info`).

use std::path::PathBuf;

use beacon::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), BeaconError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.json"));
    let config = ServerConfig::load_or_create(&config_path)?;

    tracing::info!(
        server_name = %config.server_name,
        bind = %config.bind,
        config = %config_path.display(),
        "starting beacond"
    );

    let builder = BeaconServerBuilder::from_config(&config);
    match &config.data_dir {
        Some(dir) => {
            tracing::info!(data_dir = %dir.display(), "storing records on disk");
            let server = builder.build(FileStore::open(dir)?).await?;
            server.run_until(shutdown_signal()).await
        }
        None => {
            tracing::warn!("no data_dir configured, records are kept in memory only");
            let server = builder.build(MemoryStore::new()).await?;
            server.run_until(shutdown_signal()).await
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
}
