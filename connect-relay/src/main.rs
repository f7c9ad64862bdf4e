//! connect-relay binary entry point.
//!
//! Usage:
//! ```bash
//! connect-relay --config relay.toml
//! connect-relay --bind 127.0.0.1:5028
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use connect_types::UuidIdGenerator;
use qs_connect_relay::config::Config;
use qs_connect_relay::http::build_router;
use qs_connect_relay::server::ConnectRelay;
use qs_connect_relay::storage::{BlobStore, DiskBlobStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// QS Connect pairing relay.
#[derive(Parser, Debug)]
#[command(name = "connect-relay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "relay.toml")]
    config: PathBuf,

    /// Override the bind address from the configuration
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qs_connect_relay=info,connect_relay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }

    tracing::info!("Starting connect-relay v{}", env!("CARGO_PKG_VERSION"));

    let ids = Arc::new(UuidIdGenerator);
    let blobs: Arc<dyn BlobStore> = Arc::new(
        DiskBlobStore::open(
            &config.storage.upload_dir,
            ids.clone(),
            config.storage.ref_prefix_len,
        )
        .await
        .context("opening upload directory")?,
    );

    let bind_address = config.server.bind_address.clone();
    let relay = Arc::new(ConnectRelay::with_id_generator(config, ids));
    let app = build_router(relay, blobs);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("binding {bind_address}"))?;
    tracing::info!("Listening on {}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
