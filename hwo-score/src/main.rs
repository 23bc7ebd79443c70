//! hwo-score - habitability and observability scoring microservice
//!
//! Default port 5780. Serves column mapping, habitability scoring (CDHS plus
//! ML ensemble), observability scoring and a live instrument parameter
//! channel over HTTP REST + SSE.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hwo_common::config::{load_config, ConfigOverrides};
use hwo_common::events::EventBus;
use hwo_score::ml::ModelStore;
use hwo_score::observability::ReferenceCatalog;
use hwo_score::AppState;

/// Command-line arguments for hwo-score
#[derive(Parser, Debug)]
#[command(name = "hwo-score")]
#[command(about = "Exoplanet habitability and observability scoring service")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "HWO_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "HWO_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "HWO_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// Directory holding model_metadata.json and model artifacts
    #[arg(short, long, env = "HWO_MODELS_DIR")]
    models_dir: Option<PathBuf>,

    /// CSV of reference targets for observability counts
    #[arg(long, env = "HWO_CATALOG_PATH")]
    catalog_path: Option<PathBuf>,

    /// Log level or filter directive (RUST_LOG takes precedence)
    #[arg(long, env = "HWO_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bind_address: self.bind_address.clone(),
            port: self.port,
            models_dir: self.models_dir.clone(),
            catalog_path: self.catalog_path.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, config_path) = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    let config = config.with_overrides(&args.overrides());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting hwo-score (habitability scoring) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: built-in defaults"),
    }

    info!("Models directory: {}", config.models_dir.display());
    let models = ModelStore::open(&config.models_dir);
    let snapshot = models.snapshot();
    if snapshot.is_degraded() {
        warn!("Scoring in degraded mode: CDHS fallback, confidence capped");
    } else {
        info!("ML models loaded, version {}", snapshot.version().unwrap_or("unknown"));
    }

    let catalog = ReferenceCatalog::from_config(config.catalog_path.as_deref());
    info!("Observability catalog: {} targets", catalog.len());

    let event_bus = EventBus::new(100);
    let listen_address = config.listen_address();
    let state = AppState::new(config, models, catalog, event_bus);
    let app = hwo_score::build_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_address)
        .await
        .with_context(|| format!("Failed to bind to {}", listen_address))?;
    info!("Listening on http://{}", listen_address);
    info!("Health check: http://{}/health", listen_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
