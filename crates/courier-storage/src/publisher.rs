// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`StatusPublisher`] trait.
//!
//! Each publish opens its own short-lived connection and closes it before
//! returning, regardless of outcome. Connections are never pooled or held
//! across state transitions, so repeated transient failures cannot leak
//! handles.

use async_trait::async_trait;
use rusqlite::params;
use tracing::debug;

use courier_core::{CourierError, StatusPublisher, StatusUpdate};

/// Fixed primary key of the single status row.
///
/// Only one session exists per process, so only one row ever exists.
const STATUS_ROW_ID: i64 = 1;

/// SQLite-backed status publisher writing the single `service_status` row.
pub struct SqliteStatusPublisher {
    database_path: String,
    transport_version: String,
    origin: String,
}

/// One row of the `service_status` table, as read back for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub status: String,
    pub account: Option<String>,
    pub last_connected: String,
    pub version: String,
    pub origin: String,
}

impl SqliteStatusPublisher {
    /// Creates a publisher for the given database path.
    ///
    /// `transport_version` and `origin` are written unchanged with every row.
    pub fn new(database_path: String, transport_version: String, origin: String) -> Self {
        Self {
            database_path,
            transport_version,
            origin,
        }
    }

    /// Opens a connection, verifies the database answers a trivial query,
    /// and closes it again. Used as a best-effort startup probe.
    pub async fn probe(&self) -> Result<(), CourierError> {
        let conn = self.open().await?;
        let result = conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
                Ok(())
            })
            .await
            .map_err(map_db_err);
        let _ = conn.close().await;
        result
    }

    /// Reads the current status row, if one has been written.
    pub async fn current_row(&self) -> Result<Option<StatusRow>, CourierError> {
        let conn = self.open().await?;
        let result = conn
            .call(|conn| -> Result<Option<StatusRow>, rusqlite::Error> {
                ensure_schema(conn)?;
                let mut stmt = conn.prepare(
                    "SELECT status, account, last_connected, version, origin
                     FROM service_status WHERE id = ?1",
                )?;
                let row = stmt.query_row(params![STATUS_ROW_ID], |row| {
                    Ok(StatusRow {
                        status: row.get(0)?,
                        account: row.get(1)?,
                        last_connected: row.get(2)?,
                        version: row.get(3)?,
                        origin: row.get(4)?,
                    })
                });
                match row {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await
            .map_err(map_db_err);
        let _ = conn.close().await;
        result
    }

    async fn open(&self) -> Result<tokio_rusqlite::Connection, CourierError> {
        tokio_rusqlite::Connection::open(&self.database_path)
            .await
            .map_err(map_db_err)
    }
}

#[async_trait]
impl StatusPublisher for SqliteStatusPublisher {
    async fn publish(&self, update: StatusUpdate) -> Result<(), CourierError> {
        let conn = self.open().await?;

        let status = update.status;
        let account = update.account.clone();
        let version = self.transport_version.clone();
        let origin = self.origin.clone();
        let now = chrono::Utc::now().to_rfc3339();

        let result = conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                ensure_schema(conn)?;
                conn.execute(
                    "INSERT INTO service_status
                         (id, status, account, last_connected, version, origin, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                     ON CONFLICT(id) DO UPDATE SET
                         status = excluded.status,
                         account = excluded.account,
                         last_connected = excluded.last_connected,
                         version = excluded.version,
                         origin = excluded.origin,
                         updated_at = excluded.updated_at",
                    params![STATUS_ROW_ID, status, account, now, version, origin, now],
                )?;
                Ok(())
            })
            .await
            .map_err(map_db_err);

        // Connection is closed whether the upsert succeeded or not.
        let _ = conn.close().await;

        if result.is_ok() {
            debug!(status = update.status, "status row updated");
        }
        result
    }
}

fn ensure_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS service_status (
            id INTEGER PRIMARY KEY,
            status TEXT NOT NULL,
            account TEXT,
            last_connected TEXT NOT NULL,
            version TEXT NOT NULL,
            origin TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )
}

fn map_db_err<E: std::error::Error + Send + Sync + 'static>(e: E) -> CourierError {
    CourierError::Storage {
        source: Box::new(e),
    }
}
