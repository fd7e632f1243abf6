use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::ChatError;

use super::{resolve_range, KvStore};

/// [`KvStore`] on SQLite: a `kv` table for scalar keys and a `kv_list` table
/// whose autoincrement `id` gives list order.
#[derive(Clone)]
pub struct SqliteKv {
    db_pool: SqlitePool,
}

impl SqliteKv {
    pub async fn connect(url: &str) -> Result<SqliteKv, ChatError> {
        let options = if url.contains(":memory:") {
            // every pooled connection would otherwise open its own empty database
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(16)
        };

        let db_pool = options.connect(url).await?;
        let kv = SqliteKv { db_pool };
        kv.migrate().await?;
        Ok(kv)
    }

    async fn migrate(&self) -> Result<(), ChatError> {
        sqlx::query("CREATE TABLE IF NOT EXISTS kv (key TEXT PRIMARY KEY NOT NULL, value TEXT NOT NULL)")
            .execute(&self.db_pool)
            .await?;
        sqlx::query("CREATE TABLE IF NOT EXISTS kv_list (id INTEGER PRIMARY KEY AUTOINCREMENT, key TEXT NOT NULL, value TEXT NOT NULL)")
            .execute(&self.db_pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS kv_list_key ON kv_list (key, id)")
            .execute(&self.db_pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for SqliteKv {
    async fn get(&self, key: &str) -> Result<Option<String>, ChatError> {
        let value: Option<(String,)> = sqlx::query_as("SELECT value FROM kv WHERE key=?")
            .bind(key)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(value.map(|(value,)| value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ChatError> {
        sqlx::query("INSERT INTO kv (key,value) VALUES (?,?) ON CONFLICT(key) DO UPDATE SET value=excluded.value")
            .bind(key)
            .bind(value)
            .execute(&self.db_pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, ChatError> {
        let scalars = sqlx::query("DELETE FROM kv WHERE key=?")
            .bind(key)
            .execute(&self.db_pool)
            .await?;
        let items = sqlx::query("DELETE FROM kv_list WHERE key=?")
            .bind(key)
            .execute(&self.db_pool)
            .await?;
        Ok(scalars.rows_affected() + items.rows_affected() > 0)
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, ChatError> {
        let keys: Vec<(String,)> = sqlx::query_as("SELECT key FROM kv WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key")
            .bind(prefix)
            .fetch_all(&self.db_pool)
            .await?;
        Ok(keys.into_iter().map(|(key,)| key).collect())
    }

    async fn list_append(&self, key: &str, value: &str) -> Result<usize, ChatError> {
        sqlx::query("INSERT INTO kv_list (key,value) VALUES (?,?)")
            .bind(key)
            .bind(value)
            .execute(&self.db_pool)
            .await?;
        let (len,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM kv_list WHERE key=?")
            .bind(key)
            .fetch_one(&self.db_pool)
            .await?;
        Ok(len as usize)
    }

    async fn list_trim(&self, key: &str, start: i64, stop: i64) -> Result<(), ChatError> {
        let mut tx = self.db_pool.begin().await?;

        let ids: Vec<(i64,)> = sqlx::query_as("SELECT id FROM kv_list WHERE key=? ORDER BY id")
            .bind(key)
            .fetch_all(&mut *tx)
            .await?;

        let (keep_from, keep_to) = match resolve_range(ids.len(), start, stop) {
            Some((from, to)) => (ids[from].0, ids[to - 1].0),
            None => {
                sqlx::query("DELETE FROM kv_list WHERE key=?")
                    .bind(key)
                    .execute(&mut *tx)
                    .await?;
                tx.commit().await?;
                return Ok(());
            }
        };

        sqlx::query("DELETE FROM kv_list WHERE key=? AND (id<? OR id>?)")
            .bind(key)
            .bind(keep_from)
            .bind(keep_to)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, ChatError> {
        let values: Vec<(String,)> = sqlx::query_as("SELECT value FROM kv_list WHERE key=? ORDER BY id")
            .bind(key)
            .fetch_all(&self.db_pool)
            .await?;

        let Some((from, to)) = resolve_range(values.len(), start, stop) else {
            return Ok(Vec::new());
        };

        Ok(values[from..to].iter().map(|(value,)| value.clone()).collect())
    }
}
