use chrono::Utc;
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, FromRow)]
pub struct BlobRow {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

pub async fn fetch_blob(db: &SqlitePool, key: &str) -> Result<Option<BlobRow>, sqlx::Error> {
    sqlx::query_as::<_, BlobRow>("SELECT key, value, updated_at FROM blob_store WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
}

pub async fn upsert_blob(db: &SqlitePool, key: &str, value: &str) -> Result<BlobRow, sqlx::Error> {
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO blob_store (key, value, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(BlobRow {
        key: key.to_string(),
        value: value.to_string(),
        updated_at: now,
    })
}

pub async fn delete_blob(db: &SqlitePool, key: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM blob_store WHERE key = ?")
        .bind(key)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}
