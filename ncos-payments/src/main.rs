//! ncos-payments - payment links, splits, earnings and analysis scheduling
//!
//! Configuration priority: command line, environment, config.toml, defaults.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use ncos_common::config::{CliOverrides, ServiceConfig};
use ncos_payments::db::SqliteStore;
use ncos_payments::services::{AnalysisQueue, HttpAnalyzer, DEFAULT_QUEUE_CAPACITY};
use ncos_payments::{build_router, AppState};

#[derive(Debug, Parser)]
#[command(name = "ncos-payments", version, about = "Payments and earnings service")]
struct Args {
    /// Path to config.toml
    #[arg(long, env = "NCOS_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, e.g. 127.0.0.1:5740
    #[arg(long)]
    bind: Option<String>,

    /// SQLite database file
    #[arg(long)]
    database: Option<PathBuf>,

    /// Base URL used when building payment link URLs
    #[arg(long)]
    public_base_url: Option<String>,

    /// Base URL of the audio analysis worker
    #[arg(long)]
    analyzer_url: Option<String>,

    /// Platform fee percentage in [0, 100)
    #[arg(long)]
    platform_fee: Option<f64>,

    /// Tracing filter directive, e.g. "info" or "ncos_payments=debug"
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            bind_address: self.bind.clone(),
            database_path: self.database.clone(),
            public_base_url: self.public_base_url.clone(),
            analyzer_url: self.analyzer_url.clone(),
            platform_fee_percentage: self.platform_fee,
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = ServiceConfig::resolve(&args.overrides(), args.config.as_deref())
        .context("Failed to resolve configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    // Build identification first, before any database work
    info!(
        "Starting NCOS Payments (ncos-payments) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    info!("Database path: {}", config.database_path.display());
    let pool = match ncos_common::db::init_database(&config.database_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    let store = Arc::new(SqliteStore::new(pool));
    let analyzer = Arc::new(
        HttpAnalyzer::new(config.analyzer_url.clone()).context("Failed to build analyzer client")?,
    );
    let (analysis, _worker) = AnalysisQueue::start(store.clone(), analyzer, DEFAULT_QUEUE_CAPACITY);

    info!(
        public_base_url = %config.public_base_url,
        analyzer_url = %config.analyzer_url,
        platform_fee_percentage = config.platform_fee_percentage,
        "Services configured"
    );

    let state = AppState::new(
        store,
        analysis,
        &config.public_base_url,
        config.platform_fee_fraction(),
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    info!("ncos-payments listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
