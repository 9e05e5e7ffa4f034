//! SQLite translation store
//!
//! One table, `translations`, keyed by the normalized source text. The
//! `UNIQUE(source)` constraint is the only concurrency safeguard: a second
//! insert of the same key fails with [`StoreError::Conflict`].
//!
//! Timestamps are Unix milliseconds produced by SQLite itself, never by the
//! application.

use crate::error::StoreError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;

/// SQL expression for "now" in Unix milliseconds
const NOW_MILLIS: &str = "CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER)";

const RECORD_COLUMNS: &str = "id, source, translation, view_count, created_at, updated_at";

/// A cached translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub id: i64,
    /// Normalized (trimmed, lower-cased) source text
    pub source: String,
    pub translation: String,
    pub view_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl sqlx::FromRow<'_, sqlx::sqlite::SqliteRow> for TranslationRecord {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            source: row.try_get("source")?,
            translation: row.try_get("translation")?,
            view_count: row.try_get("view_count")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Aggregates over the whole table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSummary {
    pub total_count: i64,
    pub total_views: i64,
    /// Records with `view_count > 1`
    pub popular_count: i64,
    /// Records with `view_count == 1`
    pub one_view_count: i64,
}

/// Persistent translation storage
#[async_trait]
pub trait TranslationStore: Send + Sync + 'static {
    /// Exact lookup by normalized source
    async fn find(&self, source: &str) -> Result<Option<TranslationRecord>, StoreError>;

    /// Insert a new record with `view_count = 1`
    async fn insert(&self, source: &str, translation: &str) -> Result<TranslationRecord, StoreError>;

    /// Atomically add 1 to `view_count` and refresh `updated_at`
    async fn increment_view(&self, record: &TranslationRecord) -> Result<TranslationRecord, StoreError>;

    /// Replace the translation text of an existing record
    async fn update_translation(&self, id: i64, translation: &str) -> Result<TranslationRecord, StoreError>;

    async fn summary(&self) -> Result<ViewSummary, StoreError>;

    /// Most viewed records, ties broken by source ascending
    async fn top_by_views(&self, limit: i64) -> Result<Vec<TranslationRecord>, StoreError>;

    /// Most recently created records
    async fn most_recent(&self, limit: i64) -> Result<Vec<TranslationRecord>, StoreError>;
}

/// [`TranslationStore`] backed by a SQLite connection pool
#[derive(Debug, Clone)]
pub struct SqliteTranslationStore {
    pool: SqlitePool,
}

impl SqliteTranslationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url`, creating the file if needed, and run migrations
    ///
    /// # Example
    ///
    /// ```ignore
    /// let store = SqliteTranslationStore::connect("sqlite:./data/translations.db", 5).await?;
    /// ```
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database url: {}", database_url))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30));

        // Every connection to an in-memory database is a separate database
        let max_connections = if database_url.contains(":memory:") {
            1
        } else {
            max_connections
        };

        if let Some(path) = options.get_filename().parent() {
            if !path.as_os_str().is_empty() && !database_url.contains(":memory:") {
                std::fs::create_dir_all(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .context("Failed to connect to translation database")?;

        Self::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .context("Failed to run translation database migrations")?;

        tracing::info!("Translation database migrations completed");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn map_insert_error(err: sqlx::Error, source: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Conflict(source.to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl TranslationStore for SqliteTranslationStore {
    async fn find(&self, source: &str) -> Result<Option<TranslationRecord>, StoreError> {
        let record = sqlx::query_as::<_, TranslationRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM translations WHERE source = ?"
        ))
        .bind(source)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn insert(&self, source: &str, translation: &str) -> Result<TranslationRecord, StoreError> {
        sqlx::query_as::<_, TranslationRecord>(&format!(
            "INSERT INTO translations (source, translation, view_count)
             VALUES (?, ?, 1)
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(source)
        .bind(translation)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, source))
    }

    async fn increment_view(&self, record: &TranslationRecord) -> Result<TranslationRecord, StoreError> {
        sqlx::query_as::<_, TranslationRecord>(&format!(
            "UPDATE translations
             SET view_count = view_count + 1, updated_at = {NOW_MILLIS}
             WHERE id = ?
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(record.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(record.id))
    }

    async fn update_translation(&self, id: i64, translation: &str) -> Result<TranslationRecord, StoreError> {
        sqlx::query_as::<_, TranslationRecord>(&format!(
            "UPDATE translations
             SET translation = ?, updated_at = {NOW_MILLIS}
             WHERE id = ?
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(translation)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(id))
    }

    async fn summary(&self) -> Result<ViewSummary, StoreError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total_count,
                    COALESCE(SUM(view_count), 0) AS total_views,
                    COALESCE(SUM(CASE WHEN view_count > 1 THEN 1 ELSE 0 END), 0) AS popular_count,
                    COALESCE(SUM(CASE WHEN view_count = 1 THEN 1 ELSE 0 END), 0) AS one_view_count
             FROM translations",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(ViewSummary {
            total_count: row.try_get("total_count")?,
            total_views: row.try_get("total_views")?,
            popular_count: row.try_get("popular_count")?,
            one_view_count: row.try_get("one_view_count")?,
        })
    }

    async fn top_by_views(&self, limit: i64) -> Result<Vec<TranslationRecord>, StoreError> {
        let records = sqlx::query_as::<_, TranslationRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM translations
             ORDER BY view_count DESC, source ASC
             LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn most_recent(&self, limit: i64) -> Result<Vec<TranslationRecord>, StoreError> {
        let records = sqlx::query_as::<_, TranslationRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM translations
             ORDER BY created_at DESC, id DESC
             LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

#[cfg(test)]
pub(crate) async fn create_test_store() -> SqliteTranslationStore {
    SqliteTranslationStore::connect("sqlite::memory:", 1)
        .await
        .unwrap()
}
