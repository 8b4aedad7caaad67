//! Append-only time-series store for collected metric samples.
//!
//! One SQLite file holds a single `metrics` table. Rows are written
//! once per collection interval and never mutated; the only query
//! shape is "most recent N, newest first". The store assigns the
//! timestamp at insertion time (`DEFAULT CURRENT_TIMESTAMP`), so
//! callers never supply one.

use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::path::Path;

use crate::error::StoreError;

/// One sample as handed to [`MetricStore::append`]; the store assigns
/// the timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSample {
    /// Ticks per second at collection time.
    pub tps: f64,
    /// Mean milliseconds per tick at collection time.
    pub mspt: f64,
    /// Process CPU usage, percent.
    pub cpu_process: f64,
    /// Whole-host CPU usage, percent.
    pub cpu_system: f64,
    /// Process memory used, MiB.
    pub memory_used: f64,
    /// Memory ceiling, MiB.
    pub memory_max: f64,
}

/// One persisted row as returned by [`MetricStore::recent`].
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct MetricRow {
    /// Store-assigned insertion timestamp (`YYYY-MM-DD HH:MM:SS`, UTC).
    pub timestamp: String,
    /// Ticks per second at collection time.
    pub tps: f64,
    /// Mean milliseconds per tick at collection time.
    pub mspt: f64,
    /// Process CPU usage, percent.
    pub cpu_process: f64,
    /// Whole-host CPU usage, percent.
    pub cpu_system: f64,
    /// Process memory used, MiB.
    pub memory_used: f64,
    /// Memory ceiling, MiB.
    pub memory_max: f64,
}

/// Handle onto the metric history database. Cheap to clone; all clones
/// share one connection pool.
#[derive(Debug, Clone)]
pub struct MetricStore {
    pool: SqlitePool,
}

impl MetricStore {
    /// Open (creating if missing) the database file at `path` and
    /// ensure the schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`] if the file cannot be opened or
    /// created, or [`StoreError::Query`] if schema setup fails.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Open(format!("create {}: {e}", parent.display())))?;
            }
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Open(format!("open {}: {e}", path.display())))?;

        let store = Self { pool };
        store.init().await?;
        tracing::info!(path = %path.display(), "metric store ready");
        Ok(store)
    }

    /// Open a private in-memory database. Used by tests.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if schema setup fails.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(SqliteConnectOptions::new().in_memory(true))
            .await
            .map_err(|e| StoreError::Open(format!("open in-memory: {e}")))?;
        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    /// Create the `metrics` table if it does not exist yet.
    async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS metrics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                tps REAL,
                mspt REAL,
                cpu_process REAL,
                cpu_system REAL,
                memory_used REAL,
                memory_max REAL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Append one sample; the store assigns the timestamp.
    ///
    /// Callers treat persistence as fire-and-forget: spawn this and
    /// log a failure, never fail the operation that produced the
    /// sample.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the insert fails.
    pub async fn append(&self, sample: &MetricSample) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO metrics (tps, mspt, cpu_process, cpu_system, memory_used, memory_max)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(sample.tps)
        .bind(sample.mspt)
        .bind(sample.cpu_process)
        .bind(sample.cpu_system)
        .bind(sample.memory_used)
        .bind(sample.memory_max)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The most recent `limit` rows, newest first.
    ///
    /// `id` breaks ties between rows sharing one timestamp second, so
    /// the order is deterministic.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the select fails.
    pub async fn recent(&self, limit: u32) -> Result<Vec<MetricRow>, StoreError> {
        let rows = sqlx::query_as::<_, MetricRow>(
            "SELECT timestamp, tps, mspt, cpu_process, cpu_system, memory_used, memory_max
             FROM metrics ORDER BY timestamp DESC, id DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
