// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memoized step outputs, keyed by event id and step name.

use lessonflow_core::LessonflowError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Stored output of a completed step, if any.
pub async fn get_step(
    db: &Database,
    event_id: &str,
    step_name: &str,
) -> Result<Option<String>, LessonflowError> {
    let event_id = event_id.to_string();
    let step_name = step_name.to_string();
    db.connection()
        .call(move |conn| {
            match conn.query_row(
                "SELECT output FROM step_results WHERE event_id = ?1 AND step_name = ?2",
                params![event_id, step_name],
                |row| row.get(0),
            ) {
                Ok(out) => Ok(Some(out)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Persist a step's output. The first stored output for a step wins.
pub async fn save_step(
    db: &Database,
    event_id: &str,
    step_name: &str,
    output: &str,
) -> Result<(), LessonflowError> {
    let event_id = event_id.to_string();
    let step_name = step_name.to_string();
    let output = output.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO step_results (event_id, step_name, output) VALUES (?1, ?2, ?3)
                 ON CONFLICT (event_id, step_name) DO NOTHING",
                params![event_id, step_name, output],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Names of the steps completed for an event, in completion order.
pub async fn completed_steps(db: &Database, event_id: &str) -> Result<Vec<String>, LessonflowError> {
    let event_id = event_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT step_name FROM step_results WHERE event_id = ?1 ORDER BY rowid",
            )?;
            let rows = stmt.query_map(params![event_id], |row| row.get(0))?;
            rows.collect::<Result<Vec<String>, _>>()
        })
        .await
        .map_err(map_tr_err)
}
