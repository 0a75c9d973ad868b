use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use user_groups_api::config::{self, StorageBackend};
use user_groups_api::database::{schema, DatabaseManager, Gateway, MemoryGateway, PgGateway};
use user_groups_api::{app, AppState};

#[derive(Parser)]
#[command(name = "user-groups-api")]
#[command(about = "Users and groups HTTP API")]
#[command(version)]
struct Args {
    #[arg(long, help = "Address to bind (overrides APP_HOST)")]
    host: Option<String>,

    #[arg(long, help = "Port to listen on (overrides APP_PORT/PORT)")]
    port: Option<u16>,

    #[arg(long, value_enum, help = "Storage backend (overrides STORAGE_BACKEND)")]
    storage: Option<StorageBackend>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    // Initialize configuration (this loads the config singleton)
    let mut config = config::config().clone();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(storage) = args.storage {
        config.database.backend = storage;
    }

    tracing::info!("Starting users and groups API in {:?} mode", config.environment);
    if config.security.jwt_secret.is_empty() {
        tracing::warn!("JWT_SECRET is not set; /authenticate will fail until it is configured");
    }

    let gateway: Arc<dyn Gateway> = match config.database.backend {
        StorageBackend::Postgres => {
            let pool = DatabaseManager::connect(&config.database)
                .await
                .context("failed to connect to PostgreSQL")?;
            schema::ensure_schema(&pool)
                .await
                .context("failed to prepare database schema")?;
            Arc::new(PgGateway::new(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");
            Arc::new(MemoryGateway::new())
        }
    };

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(gateway, config);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
