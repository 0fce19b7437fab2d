//! Database redundancy service.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌───────────────────────────────────────────────┐
//!   operator      │              REDUNDANCY MANAGER                │
//!   ──────────────┼─▶ admin API ──▶ force sync/failover/failback  │
//!                 │                         │                      │
//!                 │   health timer ──▶ health monitor ──┐          │
//!                 │                                     ▼          │
//!                 │                       failover state machine   │
//!                 │                                     │          │
//!                 │   sync timer ──▶ sync engine ◀──────┘          │
//!                 │                   │        │                   │
//!                 └───────────────────┼────────┼───────────────────┘
//!                                     ▼        ▼
//!                               primary    secondary
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use db_redundancy::admin::AdminState;
use db_redundancy::config::{config_warnings, load_config, redact_url};
use db_redundancy::lifecycle::shutdown_signal;
use db_redundancy::observability::{logging, metrics};
use db_redundancy::{HttpServer, MemoryStore, PgStore, RedundancyManager, ServiceConfig, StoreConnector};

#[derive(Parser)]
#[command(name = "db-redundancy")]
#[command(about = "Primary/secondary database health, failover and sync", long_about = None)]
struct Args {
    /// TOML configuration file; environment variables override it.
    #[arg(short, long, env = "DB_REDUNDANCY_CONFIG")]
    config: Option<PathBuf>,

    /// Use in-process stores instead of dialing the configured databases.
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(2);
        }
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("db-redundancy v{} starting", env!("CARGO_PKG_VERSION"));
    for warning in config_warnings(&config) {
        tracing::warn!(%warning, "Configuration warning");
    }

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let primary_url = config
        .stores
        .primary_url
        .clone()
        .ok_or("primary store connection string is required")?;
    let secondary_url = config.stores.secondary_url.clone();

    if args.in_memory {
        tracing::warn!("Running against in-memory stores; no database will be dialed");
        let primary = Arc::new(MemoryStore::new(&redact_url(&primary_url)));
        let secondary = secondary_url.map(|url| Arc::new(MemoryStore::new(&redact_url(&url))));
        return serve(config, primary, secondary).await;
    }

    let primary = Arc::new(PgStore::connect_lazy("primary", &primary_url, &config.stores)?);
    let secondary = match secondary_url {
        Some(url) => Some(Arc::new(PgStore::connect_lazy("secondary", &url, &config.stores)?)),
        None => None,
    };
    serve(config, primary, secondary).await
}

async fn serve<C: StoreConnector>(
    config: ServiceConfig,
    primary: Arc<C>,
    secondary: Option<Arc<C>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let manager = RedundancyManager::start(
        primary,
        secondary,
        &config.redundancy,
        config.replication.entity_set(),
    )
    .await;

    let listener = match TcpListener::bind(&config.listener.bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %config.listener.bind_address, error = %e, "Failed to bind listener");
            manager.shutdown().await;
            return Err(e.into());
        }
    };

    let state = AdminState::new(manager.clone(), config.admin.api_key.clone());
    let server = HttpServer::new(&config.listener, state);
    let served = server.run(listener, shutdown_signal()).await;

    manager.shutdown().await;
    served?;

    tracing::info!("Shutdown complete");
    Ok(())
}
