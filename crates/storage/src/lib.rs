use std::{fs, path::Path, str::FromStr};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use shared::protocol::MatchResult;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};

/// Key the upload screen writes analysis results under and the result
/// screen reads them back from.
pub const ANALYZE_RESULTS_KEY: &str = "analyzeResults";

/// Durable client-side store, one SQLite file per profile.
///
/// This is the systems counterpart of origin-scoped browser storage: a
/// small key-value table the two screens share across restarts.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredResults {
    pub results: Vec<MatchResult>,
    pub saved_at: DateTime<Utc>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        let storage = Self { pool };
        storage.ensure_results_table().await?;
        Ok(storage)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_results_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stored_results (
                key      TEXT NOT NULL PRIMARY KEY,
                payload  TEXT NOT NULL,
                saved_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure stored_results table exists")?;
        Ok(())
    }

    /// Persist a result list, replacing any previous entry under the key.
    pub async fn save_results(&self, key: &str, results: &[MatchResult]) -> Result<()> {
        let payload = serde_json::to_string(results).context("failed to encode result payload")?;
        sqlx::query(
            "INSERT INTO stored_results (key, payload, saved_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET payload=excluded.payload, saved_at=excluded.saved_at",
        )
        .bind(key)
        .bind(payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Read back a stored result list.
    ///
    /// A missing row and an undecodable payload both read as `None`; the
    /// result screen treats either as the empty result set.
    pub async fn load_results(&self, key: &str) -> Result<Option<StoredResults>> {
        let row = sqlx::query("SELECT payload, saved_at FROM stored_results WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let payload: String = row.get(0);
        let Ok(results) = serde_json::from_str::<Vec<MatchResult>>(&payload) else {
            return Ok(None);
        };

        let saved_at_raw: String = row.get(1);
        let saved_at = DateTime::parse_from_rfc3339(&saved_at_raw)
            .map(|ts| ts.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Some(StoredResults { results, saved_at }))
    }

    pub async fn clear_results(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM stored_results WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return Ok(());
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();
    if path.is_empty() {
        return Ok(());
    }

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create parent directory for database url '{database_url}'")
            })?;
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
