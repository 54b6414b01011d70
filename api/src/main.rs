use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod auth;
mod config;
mod error;
mod extract;
mod ids;
mod middleware;
mod records;
mod routes;
mod state;
mod store;
#[cfg(test)]
mod testing;

use config::{Config, ConfigError, StoreBackend, Validated};
use ids::client::IdsClient;
use ids::gotrue::GoTrueProvider;
use store::RecordStore;
use store::memory::MemoryStore;
use store::postgres::PgStore;
use store::rest::RestStore;

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to connect to database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to run migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(std::io::Error),
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "merlin_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = Config::parse();
    if let Err(err) = run(config).await {
        tracing::error!(error = %err, "merlin-api failed to start");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), StartupError> {
    let config = config.validate()?;
    let client = IdsClient::new(config.ids_url.clone(), config.ids_key.clone());

    let identity = Arc::new(GoTrueProvider::new(client.clone()));
    let store = build_store(&config, client).await?;
    let app = app::build(state::AppState::new(identity, store), &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: config.addr,
            source,
        })?;
    tracing::info!(addr = %config.addr, store = ?config.store, "Merlin API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)
}

async fn build_store(
    config: &Validated,
    client: IdsClient,
) -> Result<Arc<dyn RecordStore>, StartupError> {
    match config.store {
        StoreBackend::Rest => Ok(Arc::new(RestStore::new(client))),
        StoreBackend::Memory => {
            tracing::warn!("using in-memory record store; data is lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or(ConfigError::MissingDatabaseUrl)?;
            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .connect(database_url)
                .await?;

            sqlx::migrate!("../migrations").run(&pool).await?;
            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
