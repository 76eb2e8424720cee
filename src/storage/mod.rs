pub mod memory;
pub mod postgres;
pub mod sqlite;
pub mod trait_def;
pub mod writer;

pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;
pub use sqlite::SqliteStorage;
pub use trait_def::{SnapshotStorage, StorageError, StorageResult, DEFAULT_RECORD_NAME};
pub use writer::SnapshotWriter;

use crate::config::{DatabaseBackend, DatabaseConfig};
use std::sync::Arc;

/// Connect to the configured backend and make sure its tables exist.
pub async fn open(config: &DatabaseConfig) -> anyhow::Result<Arc<dyn SnapshotStorage>> {
    let storage: Arc<dyn SnapshotStorage> = match config.backend {
        DatabaseBackend::Sqlite => {
            tracing::info!("Using SQLite storage: {}", config.url);
            Arc::new(SqliteStorage::new(&config.url, config.max_connections, &config.record_name).await?)
        }
        DatabaseBackend::Postgres => {
            tracing::info!("Using PostgreSQL storage: {}", config.url);
            Arc::new(PostgresStorage::new(&config.url, config.max_connections, &config.record_name).await?)
        }
        DatabaseBackend::Memory => {
            tracing::warn!("Using in-memory storage, visited state will not survive restarts");
            Arc::new(MemoryStorage::new())
        }
    };

    storage.init().await?;
    Ok(storage)
}
