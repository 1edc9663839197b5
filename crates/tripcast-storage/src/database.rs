// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use tracing::{debug, info};
use tripcast_core::TripcastError;

use crate::migrations;

/// Handle to the Tripcast SQLite database.
///
/// Cloning is cheap: clones share the same background writer thread.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path` in WAL mode and
    /// applies pending migrations.
    pub async fn open(path: &str) -> Result<Self, TripcastError> {
        Self::open_with(path, true).await
    }

    /// Opens the database, choosing the journal mode explicitly.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, TripcastError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| TripcastError::Storage {
                source: Box::new(e),
            })?;
        }

        // Migrations need a plain rusqlite connection; run them off the
        // async runtime before the writer thread starts.
        let migrate_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), TripcastError> {
            let mut conn = rusqlite::Connection::open(&migrate_path).map_err(storage_err)?;
            apply_pragmas(&conn, wal_mode).map_err(storage_err)?;
            migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| TripcastError::Internal(format!("migration task panicked: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(storage_err)?;
        conn.call(move |conn| apply_pragmas(conn, wal_mode))
            .await
            .map_err(map_tr_err)?;

        info!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The single writer connection. Every query goes through `call`.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoints the WAL and closes the connection.
    pub async fn close(self) -> Result<(), TripcastError> {
        self.checkpoint().await?;
        self.conn.close().await.map_err(map_tr_err)?;
        debug!("database closed");
        Ok(())
    }

    /// Folds the WAL back into the main database file.
    pub async fn checkpoint(&self) -> Result<(), TripcastError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

fn apply_pragmas(conn: &rusqlite::Connection, wal_mode: bool) -> Result<(), rusqlite::Error> {
    if wal_mode {
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    }
    conn.execute_batch(
        "PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )
}

fn storage_err(e: rusqlite::Error) -> TripcastError {
    TripcastError::Storage {
        source: Box::new(e),
    }
}

/// Converts a tokio-rusqlite error into [`TripcastError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> TripcastError {
    TripcastError::Storage {
        source: Box::new(e),
    }
}
