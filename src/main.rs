use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

mod clock;
mod config;
mod error;
mod history;
mod models;
mod routes;
mod scheduler;
mod store;

use clock::Clock;
use config::{Config, StoreBackend};
use store::{FileStore, KeyValueStore, MedicationStore, MemoryStore, PgStore};

#[derive(Clone)]
pub struct AppState {
    pub store: MedicationStore,
    pub clock: Clock,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("meditrack_backend=info")),
        )
        .init();

    let config = Config::from_env()?;
    let kv = open_store(&config.backend).await?;
    tracing::info!("🗄️ Using {} store", kv.name());

    let state = AppState {
        store: MedicationStore::new(kv),
        clock: Clock::System,
    };
    let app = routes::app(state);

    tracing::info!("🧠 Server running at {}", config.bind_addr);

    axum::serve(
        tokio::net::TcpListener::bind(config.bind_addr)
            .await
            .with_context(|| format!("binding {}", config.bind_addr))?,
        app.into_make_service(),
    )
    .await?;

    Ok(())
}

async fn open_store(backend: &StoreBackend) -> Result<Arc<dyn KeyValueStore>> {
    let kv: Arc<dyn KeyValueStore> = match backend {
        StoreBackend::Memory => {
            tracing::warn!("⚠️ In-memory store: data is lost on restart");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::File(path) => Arc::new(FileStore::new(path.clone())),
        StoreBackend::Postgres {
            database_url,
            max_connections,
        } => Arc::new(
            PgStore::connect(database_url, *max_connections)
                .await
                .context("connecting to PostgreSQL")?,
        ),
    };
    Ok(kv)
}
