//! Stitch server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use std::net::SocketAddr;
use stitch_core::AppConfig;
use stitch_server::{build_router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Stitch - chunked file upload service
#[derive(Parser, Debug)]
#[command(name = "stitchd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "STITCH_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Stitch v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration. The file is optional: every setting has a
    // default and STITCH_ env vars can provide or override anything.
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();
    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("No config file found at {}", args.config);
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("STITCH_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    // Register Prometheus metrics
    stitch_server::metrics::register_metrics();

    // Initialize storage and verify it is reachable before accepting
    // requests, so configuration errors surface at startup rather than
    // on the first upload.
    let store = stitch_storage::from_config(&config.storage)
        .await
        .context("failed to initialize storage")?;
    store
        .health_check()
        .await
        .context("storage health check failed")?;
    tracing::info!("Storage backend initialized");

    let bind = config.server.bind.clone();
    let sweep_enabled = config.sweep.enabled;

    let state = AppState::new(config, store).context("invalid configuration")?;

    if sweep_enabled {
        stitch_server::sweep::spawn_sweeper(state.clone());
    } else {
        tracing::info!("Session sweeping disabled");
    }

    let app = build_router(state);

    let addr: SocketAddr = bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
