//! SQLite implementation of the key-value store

use async_trait::async_trait;
use chrono::Utc;
use cosmos_core::storage::{KeyValueStore, Versioned};
use sqlx::SqlitePool;
use tracing::trace;

use crate::{Error, Result};

/// Versioned key-value rows in `kv_entries`
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

fn to_version(raw: i64) -> Result<u64> {
    u64::try_from(raw).map_err(|_| Error::InvalidData(format!("negative version {}", raw)))
}

fn to_raw(version: u64) -> Result<i64> {
    i64::try_from(version).map_err(|_| Error::InvalidData(format!("version {} out of range", version)))
}

impl SqliteStore {
    /// Create a store over an open pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn get_row(&self, key: &str) -> Result<Option<Versioned>> {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT value, version FROM kv_entries WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(value, version)| {
            Ok(Versioned {
                value,
                version: to_version(version)?,
            })
        })
        .transpose()
    }

    async fn set_row(&self, key: &str, value: &str) -> Result<u64> {
        let (version,): (i64,) = sqlx::query_as(
            "INSERT INTO kv_entries (key, value, version, updated_at) VALUES (?, ?, 1, ?)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                version = kv_entries.version + 1,
                updated_at = excluded.updated_at
             RETURNING version",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        to_version(version)
    }

    async fn cas_row(&self, key: &str, expected: Option<u64>, value: &str) -> Result<bool> {
        let result = match expected {
            None => {
                sqlx::query(
                    "INSERT INTO kv_entries (key, value, version, updated_at) VALUES (?, ?, 1, ?)
                     ON CONFLICT(key) DO NOTHING",
                )
                .bind(key)
                .bind(value)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?
            }
            Some(version) => {
                sqlx::query(
                    "UPDATE kv_entries SET value = ?, version = version + 1, updated_at = ?
                     WHERE key = ? AND version = ?",
                )
                .bind(value)
                .bind(Utc::now())
                .bind(key)
                .bind(to_raw(version)?)
                .execute(&self.pool)
                .await?
            }
        };

        let written = result.rows_affected() == 1;
        trace!(key = %key, ?expected, written, "Conditional write");
        Ok(written)
    }

    async fn delete_row(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> cosmos_core::Result<Option<Versioned>> {
        Ok(self.get_row(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> cosmos_core::Result<u64> {
        Ok(self.set_row(key, value).await?)
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<u64>,
        value: &str,
    ) -> cosmos_core::Result<bool> {
        Ok(self.cas_row(key, expected, value).await?)
    }

    async fn delete(&self, key: &str) -> cosmos_core::Result<()> {
        Ok(self.delete_row(key).await?)
    }
}
