use crate::models::VisitedSnapshot;
use crate::storage::{SnapshotStorage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
    record_name: String,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32, record_name: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
            record_name: record_name.to_string(),
        })
    }
}

#[async_trait]
impl SnapshotStorage for SqliteStorage {
    async fn init(&self) -> StorageResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS visited_state (
                name TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn load(&self) -> StorageResult<Option<VisitedSnapshot>> {
        let payload = sqlx::query_scalar::<_, String>(
            r#"
            SELECT payload FROM visited_state
            WHERE name = ?
            "#,
        )
        .bind(&self.record_name)
        .fetch_optional(self.pool.as_ref())
        .await?;

        payload
            .map(|p| serde_json::from_str(&p).map_err(StorageError::from))
            .transpose()
    }

    async fn save(&self, snapshot: &VisitedSnapshot) -> StorageResult<()> {
        let payload = serde_json::to_string(snapshot)?;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO visited_state (name, payload, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT (name) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&self.record_name)
        .bind(payload)
        .bind(now)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }
}
