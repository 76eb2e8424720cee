use crate::models::VisitedSnapshot;
use async_trait::async_trait;
use thiserror::Error;

/// Name of the single record holding the visited state.
pub const DEFAULT_RECORD_NAME: &str = "visited-storage";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("stored snapshot is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Durable home of the visited-state snapshot.
///
/// Every save writes the complete snapshot; there is no incremental log.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Initialize the storage (create tables, etc.)
    async fn init(&self) -> StorageResult<()>;

    /// Load the last saved snapshot, `None` when nothing was ever saved
    async fn load(&self) -> StorageResult<Option<VisitedSnapshot>>;

    /// Replace the stored snapshot
    async fn save(&self, snapshot: &VisitedSnapshot) -> StorageResult<()>;
}
