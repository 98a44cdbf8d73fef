//! SQLite-backed override store.
//!
//! The dashboard that curates override entries lives elsewhere; this
//! store only reads entries, bumps counters, and appends audit lines.
//! The counter bump is a single SQL `UPDATE ... SET install_count =
//! install_count + 1`, so concurrent resolutions racing on the same
//! entry increment atomically at the store layer.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use thiserror::Error;
use tokio::sync::Mutex;

use apkscout_core::OverrideStore;
use apkscout_schema::{Format, OverrideEntry, OverrideTargeting, ResolutionLogEntry};

/// Errors opening or seeding the override store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying `SQLite` failure.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// An I/O error occurred creating the database directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Override store over a local `SQLite` database.
#[derive(Debug)]
pub struct SqliteOverrideStore {
    conn: Mutex<Connection>,
}

impl SqliteOverrideStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS overrides (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                package_id TEXT NOT NULL,
                min_api_level INTEGER,
                max_api_level INTEGER,
                device_models TEXT NOT NULL DEFAULT '[]',
                manufacturers TEXT NOT NULL DEFAULT '[]',
                download_url TEXT NOT NULL,
                version TEXT NOT NULL,
                format TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                expires_at TEXT,
                install_count INTEGER NOT NULL DEFAULT 0,
                failure_count INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_overrides_package
                ON overrides(package_id);
            CREATE TABLE IF NOT EXISTS resolution_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                package_id TEXT NOT NULL,
                source_tag TEXT NOT NULL,
                version TEXT,
                device_api_level INTEGER,
                success INTEGER NOT NULL,
                resolved_at TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert an entry, returning its row id. For provisioning scripts
    /// and tests; the dashboard owns normal writes.
    pub async fn insert(&self, entry: &OverrideEntry) -> Result<i64, StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO overrides (
                package_id, min_api_level, max_api_level, device_models,
                manufacturers, download_url, version, format, enabled,
                expires_at, install_count, failure_count
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                entry.package_id,
                entry.targeting.min_api_level,
                entry.targeting.max_api_level,
                serde_json::to_string(&entry.targeting.device_models).unwrap_or_default(),
                serde_json::to_string(&entry.targeting.manufacturers).unwrap_or_default(),
                entry.download_url,
                entry.version,
                entry.format.as_str(),
                entry.enabled,
                entry.expires_at.map(|t| t.to_rfc3339()),
                entry.install_count,
                entry.failure_count,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Audit-log rows so far, newest last. For dashboard tooling.
    pub async fn log_count(&self) -> Result<i64, StoreError> {
        let conn = self.conn.lock().await;
        Ok(conn.query_row("SELECT COUNT(*) FROM resolution_log", [], |row| row.get(0))?)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<OverrideEntry> {
    let models: String = row.get("device_models")?;
    let manufacturers: String = row.get("manufacturers")?;
    let format: String = row.get("format")?;
    let expires_at: Option<String> = row.get("expires_at")?;
    Ok(OverrideEntry {
        id: row.get("id")?,
        package_id: row.get("package_id")?,
        targeting: OverrideTargeting {
            min_api_level: row.get("min_api_level")?,
            max_api_level: row.get("max_api_level")?,
            device_models: serde_json::from_str(&models).unwrap_or_default(),
            manufacturers: serde_json::from_str(&manufacturers).unwrap_or_default(),
        },
        download_url: row.get("download_url")?,
        version: row.get("version")?,
        format: format.parse().unwrap_or(Format::Apk),
        enabled: row.get("enabled")?,
        expires_at: expires_at
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc)),
        install_count: row.get("install_count")?,
        failure_count: row.get("failure_count")?,
    })
}

#[async_trait]
impl OverrideStore for SqliteOverrideStore {
    async fn query_by_package(&self, package_id: &str) -> Vec<OverrideEntry> {
        let conn = self.conn.lock().await;
        let mut stmt = match conn.prepare(
            "SELECT * FROM overrides WHERE package_id = ?1 ORDER BY id",
        ) {
            Ok(stmt) => stmt,
            Err(e) => {
                tracing::warn!(error = %e, "override query failed");
                return Vec::new();
            }
        };
        match stmt.query_map(params![package_id], row_to_entry) {
            Ok(rows) => rows.filter_map(Result::ok).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "override query failed");
                Vec::new()
            }
        }
    }

    async fn increment_install_count(&self, id: i64) -> bool {
        let conn = self.conn.lock().await;
        match conn.execute(
            "UPDATE overrides SET install_count = install_count + 1 WHERE id = ?1",
            params![id],
        ) {
            Ok(changed) => changed > 0,
            Err(e) => {
                tracing::warn!(error = %e, id, "install counter update failed");
                false
            }
        }
    }

    async fn append_log(&self, entry: ResolutionLogEntry) -> bool {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO resolution_log (
                package_id, source_tag, version, device_api_level,
                success, resolved_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.package_id,
                entry.source_tag,
                entry.version,
                entry.device_api_level,
                entry.success,
                entry.resolved_at.to_rfc3339(),
            ],
        )
        .is_ok()
    }
}
