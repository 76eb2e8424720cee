use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wayfar::api;
use wayfar::catalog::RegionCatalog;
use wayfar::config::Config;
use wayfar::storage::{self, SnapshotWriter};
use wayfar::store::VisitedStore;
use wayfar::widget;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wayfar=info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    let catalog = RegionCatalog::from_path(&config.catalog.path)
        .with_context(|| format!("Failed to load region catalog from {}", config.catalog.path))?;
    info!(
        countries = catalog.total_countries(),
        regions = catalog.regions().count(),
        "Loaded region catalog"
    );
    let catalog = Arc::new(catalog);

    // Initialize storage and restore the last saved state
    let storage = storage::open(&config.database).await?;
    let mut store = VisitedStore::hydrate(Arc::clone(&catalog), storage.as_ref())
        .await
        .with_writer(SnapshotWriter::spawn(Arc::clone(&storage)));

    if let Some(dispatcher) = widget::spawn_from_config(&config.widget) {
        store = store.with_widget(dispatcher);
    }
    let store = Arc::new(store);

    let stats = store.stats();
    info!(
        visits = store.visits().len(),
        visited_countries = stats.visited_countries,
        visited_regions = stats.visited_regions,
        "Visited state ready"
    );

    let router = api::create_api_router(Arc::clone(&store));

    let api_addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("🚀 API server listening on http://{}", api_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    store.shutdown().await;
    info!("Pending state flushed, bye");

    Ok(())
}
