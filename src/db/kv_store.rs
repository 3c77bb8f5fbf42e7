//! SQLite-backed `KeyValueStore`.

use crate::db::pool::DbPool;
use crate::error::AppError;
use crate::services::store::KeyValueStore;
use async_trait::async_trait;
use serde_json::Value;

const UPSERT_SQL: &str = r#"
    INSERT INTO kv_store (key, value, updated_at)
    VALUES (?, ?, strftime('%s', 'now'))
    ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at
"#;

/// Key-value store on the `kv_store` table.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Wrap an initialized pool (see `db::initialize`).
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, AppError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some((raw,)) => serde_json::from_str(&raw).map(Some).map_err(|e| {
                AppError::database_with_op(format!("Invalid JSON in kv_store: {}", e), key)
            }),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), AppError> {
        sqlx::query(UPSERT_SQL)
            .bind(key)
            .bind(value.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_many(&self, entries: Vec<(String, Value)>) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in &entries {
            sqlx::query(UPSERT_SQL)
                .bind(key)
                .bind(value.to_string())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for key in keys {
            sqlx::query("DELETE FROM kv_store WHERE key = ?")
                .bind(*key)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), AppError> {
        sqlx::query("DELETE FROM kv_store")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use serde_json::json;
    use tempfile::tempdir;

    async fn store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let pool = db::initialize(&dir.path().join("gitping.db")).await.unwrap();
        (SqliteStore::new(pool), dir)
    }

    #[tokio::test]
    async fn test_set_get_overwrite() {
        let (store, _dir) = store().await;
        assert!(store.get("settings").await.unwrap().is_none());

        store.set("settings", json!({"username": "a"})).await.unwrap();
        store.set("settings", json!({"username": "b"})).await.unwrap();
        assert_eq!(
            store.get("settings").await.unwrap(),
            Some(json!({"username": "b"}))
        );
    }

    #[tokio::test]
    async fn test_set_many_and_remove() {
        let (store, _dir) = store().await;
        store
            .set_many(vec![
                ("team".to_string(), json!([1, 2])),
                ("mine".to_string(), json!([])),
            ])
            .await
            .unwrap();
        assert_eq!(store.get("team").await.unwrap(), Some(json!([1, 2])));

        store.remove(&["team", "absent"]).await.unwrap();
        assert!(store.get("team").await.unwrap().is_none());
        assert_eq!(store.get("mine").await.unwrap(), Some(json!([])));

        store.clear().await.unwrap();
        assert!(store.get("mine").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gitping.db");
        {
            let store = SqliteStore::new(db::initialize(&path).await.unwrap());
            store.set("lastError", json!("boom")).await.unwrap();
        }
        let store = SqliteStore::new(db::initialize(&path).await.unwrap());
        assert_eq!(store.get("lastError").await.unwrap(), Some(json!("boom")));
    }
}
