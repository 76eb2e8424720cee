use crate::models::VisitedSnapshot;
use crate::storage::{SnapshotStorage, StorageResult};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Process-local storage; state is lost on exit.
#[derive(Default)]
pub struct MemoryStorage {
    snapshot: Mutex<Option<VisitedSnapshot>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: VisitedSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
        }
    }
}

#[async_trait]
impl SnapshotStorage for MemoryStorage {
    async fn init(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn load(&self) -> StorageResult<Option<VisitedSnapshot>> {
        Ok(self.snapshot.lock().await.clone())
    }

    async fn save(&self, snapshot: &VisitedSnapshot) -> StorageResult<()> {
        *self.snapshot.lock().await = Some(snapshot.clone());
        Ok(())
    }
}
