//! Service entry point: wires config, storage, the provider registry, and
//! the arbitration core into an axum server.

use anyhow::Context;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use modsmith::arbiter::GenerationArbiter;
use modsmith::providers::ProviderRegistry;
use modsmith::rewards::RewardService;
use modsmith::server::{self, AppState};
use modsmith::storage::{SqliteStorage, Storage};
use modsmith::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("modsmith=info")),
        )
        .init();

    let config = Config::from_env();
    info!(database = %config.database_path, bind = %config.bind_addr, "starting modsmith");

    let storage: Arc<dyn Storage> = Arc::new(
        SqliteStorage::open(&config.database_path)
            .with_context(|| format!("failed to open database at {}", config.database_path))?,
    );

    let registry = ProviderRegistry::from_config(&config);
    let arbiter = Arc::new(GenerationArbiter::new(storage.clone(), registry));
    let rewards = Arc::new(RewardService::new(storage.clone()));

    let app = server::router(AppState {
        arbiter,
        storage,
        rewards,
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!("listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("server exited")?;
    Ok(())
}
