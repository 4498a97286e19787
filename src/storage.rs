//! Durable key-value store.
//!
//! Values live in a single SQLite table keyed by `(namespace, key)`. Two
//! namespaces are used by the application:
//!
//! - `plex-token` / `token`: the media-server auth token
//! - `imgur-urls` / `<thumbnail path>`: cached artwork resolutions
//!
//! The store itself knows nothing about either; callers own the encoding.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;

pub const TOKEN_NAMESPACE: &str = "plex-token";
pub const TOKEN_KEY: &str = "token";
pub const ARTWORK_NAMESPACE: &str = "imgur-urls";

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Namespaced byte store shared by the token loader and the thumbnail cache.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    async fn set(&self, namespace: &str, key: &str, value: &[u8]) -> Result<(), StoreError>;
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv (
    namespace TEXT NOT NULL,
    key       TEXT NOT NULL,
    value     BLOB NOT NULL,
    PRIMARY KEY (namespace, key)
)";

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (or creates) the database file at `path`.
    ///
    /// Parent directories are created when missing.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        tracing::info!(path = %path.display(), "Opened key-value store");
        Ok(store)
    }

    /// Private in-memory database. A single connection keeps every query on
    /// the same database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let row = sqlx::query("SELECT value FROM kv WHERE namespace = ? AND key = ?")
            .bind(namespace)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(row.try_get::<Vec<u8>, _>("value")?)),
            None => Ok(None),
        }
    }

    async fn set(&self, namespace: &str, key: &str, value: &[u8]) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO kv (namespace, key, value) VALUES (?, ?, ?)
             ON CONFLICT(namespace, key) DO UPDATE SET value = excluded.value",
        )
        .bind(namespace)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Loads the persisted auth token, if any.
pub async fn load_token(store: &dyn KeyValueStore) -> Result<Option<String>, StoreError> {
    let raw = store.get(TOKEN_NAMESPACE, TOKEN_KEY).await?;
    Ok(raw
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .filter(|token| !token.is_empty()))
}

pub async fn save_token(store: &dyn KeyValueStore, token: &str) -> Result<(), StoreError> {
    store.set(TOKEN_NAMESPACE, TOKEN_KEY, token.as_bytes()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn namespaces_are_independent() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.set("a", "k", b"one").await.unwrap();
        store.set("b", "k", b"two").await.unwrap();

        assert_eq!(store.get("a", "k").await.unwrap().as_deref(), Some(&b"one"[..]));
        assert_eq!(store.get("b", "k").await.unwrap().as_deref(), Some(&b"two"[..]));
        assert_eq!(store.get("c", "k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_replaces_existing_value() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.set("ns", "k", b"old").await.unwrap();
        store.set("ns", "k", b"new").await.unwrap();
        assert_eq!(store.get("ns", "k").await.unwrap().as_deref(), Some(&b"new"[..]));
    }

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.sqlite");

        let store = SqliteStore::open(&path).await.unwrap();
        save_token(&store, "secret").await.unwrap();
        store.close().await;

        let reopened = SqliteStore::open(&path).await.unwrap();
        assert_eq!(load_token(&reopened).await.unwrap().as_deref(), Some("secret"));
    }

    #[tokio::test]
    async fn empty_token_is_treated_as_missing() {
        let store = SqliteStore::in_memory().await.unwrap();
        save_token(&store, "").await.unwrap();
        assert_eq!(load_token(&store).await.unwrap(), None);
    }
}
