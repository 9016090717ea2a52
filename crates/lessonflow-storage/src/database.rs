// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All reads and writes are serialized through tokio-rusqlite's single
//! background thread. Do NOT open additional connections for writes.

use std::path::Path;

use lessonflow_core::LessonflowError;
use tracing::{debug, info};

use crate::migrations::run_migrations;

/// Handle to the Lessonflow SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path` in WAL mode, apply
    /// PRAGMAs, and run pending migrations.
    pub async fn open(path: &str) -> Result<Self, LessonflowError> {
        Self::open_with(path, true).await
    }

    /// Open with an explicit WAL setting. Network filesystems do not support
    /// WAL, so deployments on them turn it off.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, LessonflowError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| LessonflowError::Storage {
                    source: Box::new(e),
                })?;
            }
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(sqlite_err)?;
        let db = Self { conn };
        db.configure(wal_mode).await?;
        info!(path, wal_mode, "database opened");
        Ok(db)
    }

    async fn configure(&self, wal_mode: bool) -> Result<(), LessonflowError> {
        self.conn
            .call(move |conn| {
                if wal_mode {
                    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                        row.get::<_, String>(0)
                    })?;
                }
                conn.pragma_update(None, "synchronous", "NORMAL")?;
                conn.pragma_update(None, "foreign_keys", "ON")?;
                conn.pragma_update(None, "busy_timeout", 5000)?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        let migrated = self
            .conn
            .call(|conn| Ok::<_, rusqlite::Error>(run_migrations(conn)))
            .await
            .map_err(map_tr_err)?;
        migrated?;
        debug!("migrations applied");
        Ok(())
    }

    /// The shared connection. Clone it freely; all clones feed the same
    /// background thread.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Close the connection, flushing the WAL.
    pub async fn close(self) -> Result<(), LessonflowError> {
        self.conn.close().await.map_err(map_tr_err)
    }
}

/// Convert a tokio-rusqlite error into the workspace error type.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> LessonflowError {
    LessonflowError::Storage {
        source: Box::new(e),
    }
}

/// Wrap a bare rusqlite error.
pub(crate) fn sqlite_err(e: rusqlite::Error) -> LessonflowError {
    LessonflowError::Storage {
        source: Box::new(e),
    }
}
