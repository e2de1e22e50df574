use crate::errors::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

/// Durable key-per-actor blob storage. One logical value per
/// (actor-id, key), single-key linearizable.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Save (insert or replace) a value.
    async fn save(&self, actor_id: &str, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Retrieve a value, or None if the key has never been saved or
    /// was deleted.
    async fn retrieve(&self, actor_id: &str, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Delete a value. Returns true when a row was actually removed.
    async fn delete(&self, actor_id: &str, key: &str) -> StoreResult<bool>;
}

/// SQLite-backed state store: one `actor_state` row per
/// (actor-id, key), value held as an opaque blob.
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    /// Connect to the given SQLite URL and run the idempotent schema
    /// migration. Returning from here doubles as the readiness wait:
    /// the store is usable once the DDL has been applied.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        // In-memory SQLite gives every pooled connection its own
        // database; a single connection keeps them looking at one.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS actor_state (
                actor_id TEXT NOT NULL,
                state_key TEXT NOT NULL,
                value BLOB NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (actor_id, state_key)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Migration(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn save(&self, actor_id: &str, key: &str, value: &[u8]) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO actor_state (actor_id, state_key, value, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (actor_id, state_key)
            DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(actor_id)
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn retrieve(&self, actor_id: &str, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let row = sqlx::query(
            "SELECT value FROM actor_state WHERE actor_id = ? AND state_key = ?",
        )
        .bind(actor_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.get::<Vec<u8>, _>("value")))
    }

    async fn delete(&self, actor_id: &str, key: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "DELETE FROM actor_state WHERE actor_id = ? AND state_key = ?",
        )
        .bind(actor_id)
        .bind(key)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteStateStore {
        SqliteStateStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_save_retrieve_round_trip() {
        let store = store().await;
        store.save("branch/b-1", "events", b"[1,2,3]").await.unwrap();
        let value = store.retrieve("branch/b-1", "events").await.unwrap();
        assert_eq!(value.as_deref(), Some(b"[1,2,3]".as_ref()));
    }

    #[tokio::test]
    async fn test_save_overwrites_existing_value() {
        let store = store().await;
        store.save("owner/o-1", "events", b"first").await.unwrap();
        store.save("owner/o-1", "events", b"second").await.unwrap();
        let value = store.retrieve("owner/o-1", "events").await.unwrap();
        assert_eq!(value.as_deref(), Some(b"second".as_ref()));
    }

    #[tokio::test]
    async fn test_retrieve_missing_key_is_none() {
        let store = store().await;
        assert!(store.retrieve("owner/o-1", "events").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_reports_whether_row_existed() {
        let store = store().await;
        store.save("reference/r-1", "events", b"x").await.unwrap();
        assert!(store.delete("reference/r-1", "events").await.unwrap());
        assert!(!store.delete("reference/r-1", "events").await.unwrap());
        assert!(store.retrieve("reference/r-1", "events").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_backed_store_survives_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}/state.db?mode=rwc", dir.path().display());
        {
            let store = SqliteStateStore::connect(&url).await.unwrap();
            store.save("owner/o-1", "events", b"[]").await.unwrap();
        }
        let store = SqliteStateStore::connect(&url).await.unwrap();
        let value = store.retrieve("owner/o-1", "events").await.unwrap();
        assert_eq!(value.as_deref(), Some(b"[]".as_ref()));
    }

    #[tokio::test]
    async fn test_keys_are_scoped_per_actor() {
        let store = store().await;
        store.save("branch/b-1", "events", b"mine").await.unwrap();
        store.save("branch/b-2", "events", b"yours").await.unwrap();
        store.delete("branch/b-2", "events").await.unwrap();
        let value = store.retrieve("branch/b-1", "events").await.unwrap();
        assert_eq!(value.as_deref(), Some(b"mine".as_ref()));
    }
}
