// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Named counters recomputed by the statistics job.

use lessonflow_core::LessonflowError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Replace every statistic in one transaction.
pub async fn replace_statistics(
    db: &Database,
    values: Vec<(String, i64)>,
) -> Result<(), LessonflowError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM statistics", [])?;
            {
                let mut stmt =
                    tx.prepare("INSERT INTO statistics (name, value) VALUES (?1, ?2)")?;
                for (name, value) in &values {
                    stmt.execute(params![name, value])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// All statistics ordered by name.
pub async fn get_statistics(db: &Database) -> Result<Vec<(String, i64)>, LessonflowError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT name, value FROM statistics ORDER BY name")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}
