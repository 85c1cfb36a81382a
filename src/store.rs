use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tokio::sync::RwLock;

use crate::db::repository;
use crate::error::AppError;

/// Device-local key/value storage for serialized state.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn put(&self, key: &str, value: &str) -> Result<(), AppError>;
    async fn clear(&self, key: &str) -> Result<(), AppError>;
}

pub struct SqliteBlobStore {
    db: SqlitePool,
}

impl SqliteBlobStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BlobStore for SqliteBlobStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let row = repository::fetch_blob(&self.db, key).await?;
        Ok(row.map(|r| r.value))
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), AppError> {
        let row = repository::upsert_blob(&self.db, key, value).await?;
        tracing::debug!("stored {} ({} bytes) at {}", row.key, row.value.len(), row.updated_at);
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<(), AppError> {
        repository::delete_blob(&self.db, key).await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryBlobStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let mut entries = HashMap::new();
        entries.insert(key.to_string(), value.to_string());
        Self {
            entries: RwLock::new(entries),
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.entries.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<(), AppError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
