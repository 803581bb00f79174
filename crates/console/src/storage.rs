//! Local identity store for offline use.
//!
//! A small key-value table in a SQLite file. The active identity record is
//! stored as JSON under [`IDENTITY_KEY`]; logging out elsewhere in the app is
//! just deleting that row.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::{debug, warn};

use kitchenhub_auth::IdentityRecord;
use kitchenhub_session::IdentitySource;

/// Well-known key of the identity record.
pub const IDENTITY_KEY: &str = "kitchenhub.identity";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share")]
    NoDataDir,

    #[error("failed to create storage directory at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid identity record: {0}")]
    Record(#[from] serde_json::Error),
}

/// SQLite-backed identity store.
#[derive(Debug, Clone)]
pub struct SqliteIdentityStore {
    pool: SqlitePool,
}

impl SqliteIdentityStore {
    /// Open (creating if needed) the store at `path`.
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        debug!(path = %path.display(), "identity store opened");
        Self::with_pool(pool).await
    }

    /// Private in-memory store (single connection, so every query sees the
    /// same database).
    pub async fn in_memory() -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key        TEXT PRIMARY KEY NOT NULL,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Write the active identity (login).
    pub async fn put_identity(&self, record: &IdentityRecord) -> Result<(), StorageError> {
        let data = serde_json::to_string(record)?;
        self.put_raw(IDENTITY_KEY, &data).await
    }

    /// Delete the active identity (logout). Returns whether a record existed.
    pub async fn remove_identity(&self) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM kv_store WHERE key = ?1")
            .bind(IDENTITY_KEY)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The stored identity record, if any.
    pub async fn load_identity(&self) -> Result<Option<IdentityRecord>, StorageError> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?1")
            .bind(IDENTITY_KEY)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let value: String = row.try_get("value")?;
        Ok(Some(serde_json::from_str(&value)?))
    }

    async fn put_raw(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl IdentitySource for SqliteIdentityStore {
    async fn read_identity(&self) -> Option<IdentityRecord> {
        match self.load_identity().await {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "unreadable identity record; treating as absent");
                None
            }
        }
    }
}

/// Default database location under the platform data directory.
pub fn default_db_path() -> Result<PathBuf, StorageError> {
    let mut path = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .ok_or(StorageError::NoDataDir)?;

    path.push("kitchenhub");
    path.push("console.db");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kitchenhub_auth::{IdentityId, PermissionRecord};

    #[tokio::test]
    async fn empty_store_has_no_identity() {
        let store = SqliteIdentityStore::in_memory().await.unwrap();
        assert!(store.read_identity().await.is_none());
        assert!(!store.remove_identity().await.unwrap());
    }

    #[tokio::test]
    async fn put_then_read_then_remove() {
        let store = SqliteIdentityStore::in_memory().await.unwrap();
        let record = IdentityRecord::new("42")
            .with_permissions(vec![PermissionRecord::new("admin.kitchen.view")]);

        store.put_identity(&record).await.unwrap();
        assert_eq!(store.read_identity().await, Some(record));

        // Overwrite replaces the record.
        store.put_identity(&IdentityRecord::new("43")).await.unwrap();
        let current = store.read_identity().await.unwrap();
        assert_eq!(current.id, IdentityId::new("43"));
        assert!(current.fetched_permissions.is_none());

        assert!(store.remove_identity().await.unwrap());
        assert!(store.read_identity().await.is_none());
    }

    #[tokio::test]
    async fn malformed_record_reads_as_absent() {
        let store = SqliteIdentityStore::in_memory().await.unwrap();
        store.put_raw(IDENTITY_KEY, "{not json").await.unwrap();

        assert!(matches!(
            store.load_identity().await,
            Err(StorageError::Record(_))
        ));
        assert!(store.read_identity().await.is_none());
    }

    #[tokio::test]
    async fn numeric_ids_are_accepted() {
        let store = SqliteIdentityStore::in_memory().await.unwrap();
        store
            .put_raw(IDENTITY_KEY, r#"{"id": 7, "fetchedPermissions": null}"#)
            .await
            .unwrap();
        let record = store.read_identity().await.unwrap();
        assert_eq!(record.id, IdentityId::new("7"));
    }

    #[test]
    fn default_path_lives_under_kitchenhub() {
        if let Ok(path) = default_db_path() {
            assert!(path.ends_with("kitchenhub/console.db"));
        }
    }
}
