// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable event queue.
//!
//! Events move `pending -> processing -> completed | failed`. A processing
//! row carries a lock deadline; a worker that dies mid-invocation leaves the
//! row locked until [`release_expired`] hands it back.

use lessonflow_core::LessonflowError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::EventRecord;

const EVENT_COLUMNS: &str = "seq, id, name, payload, user_id, status, attempts, max_attempts,
     last_error, created_at, locked_until";

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRecord> {
    Ok(EventRecord {
        seq: row.get(0)?,
        id: row.get(1)?,
        name: row.get(2)?,
        payload: row.get(3)?,
        user_id: row.get(4)?,
        status: row.get(5)?,
        attempts: row.get(6)?,
        max_attempts: row.get(7)?,
        last_error: row.get(8)?,
        created_at: row.get(9)?,
        locked_until: row.get(10)?,
    })
}

/// Append an event. Returns its queue sequence number.
pub async fn enqueue(
    db: &Database,
    id: &str,
    name: &str,
    payload: &str,
    user_id: Option<&str>,
    max_attempts: u32,
) -> Result<i64, LessonflowError> {
    let id = id.to_string();
    let name = name.to_string();
    let payload = payload.to_string();
    let user_id = user_id.map(str::to_string);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO events (id, name, payload, user_id, max_attempts)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, name, payload, user_id, max_attempts],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Claim the oldest pending event.
///
/// Atomically marks it `processing` with a lock deadline `lock_timeout_secs`
/// from now. Returns `None` when nothing is pending.
pub async fn dequeue(
    db: &Database,
    lock_timeout_secs: u64,
) -> Result<Option<EventRecord>, LessonflowError> {
    let lock_modifier = format!("+{lock_timeout_secs} seconds");
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let result = tx.query_row(
                &format!(
                    "SELECT {EVENT_COLUMNS} FROM events
                     WHERE status = 'pending'
                     ORDER BY seq ASC
                     LIMIT 1"
                ),
                [],
                row_to_event,
            );

            match result {
                Ok(event) => {
                    let locked_until: String = tx.query_row(
                        "UPDATE events SET status = 'processing',
                         locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?1),
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE seq = ?2
                         RETURNING locked_until",
                        params![lock_modifier, event.seq],
                        |row| row.get(0),
                    )?;
                    tx.commit()?;
                    Ok(Some(EventRecord {
                        status: "processing".to_string(),
                        locked_until: Some(locked_until),
                        ..event
                    }))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.commit()?;
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Mark an event completed.
pub async fn ack(db: &Database, seq: i64) -> Result<(), LessonflowError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE events SET status = 'completed', locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE seq = ?1",
                params![seq],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a retriable failure.
///
/// Increments attempts. Once attempts reach `max_attempts` the event is
/// failed for good; otherwise it returns to `pending`. Returns `true` when the
/// event will be retried.
pub async fn fail(db: &Database, seq: i64, error: &str) -> Result<bool, LessonflowError> {
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            let (attempts, max_attempts): (i32, i32) = conn.query_row(
                "SELECT attempts, max_attempts FROM events WHERE seq = ?1",
                params![seq],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let new_attempts = attempts + 1;
            let retry = new_attempts < max_attempts;
            conn.execute(
                "UPDATE events SET status = ?1, attempts = ?2, last_error = ?3,
                 locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE seq = ?4",
                params![
                    if retry { "pending" } else { "failed" },
                    new_attempts,
                    error,
                    seq
                ],
            )?;
            Ok(retry)
        })
        .await
        .map_err(map_tr_err)
}

/// Fail an event without further retries.
pub async fn fail_permanently(db: &Database, seq: i64, error: &str) -> Result<(), LessonflowError> {
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE events SET status = 'failed', attempts = attempts + 1,
                 last_error = ?1, locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE seq = ?2",
                params![error, seq],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Return events whose lock deadline has passed to `pending`.
pub async fn release_expired(db: &Database) -> Result<usize, LessonflowError> {
    db.connection()
        .call(|conn| {
            conn.execute(
                "UPDATE events SET status = 'pending', locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE status = 'processing'
                   AND locked_until < strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                [],
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Look up an event by id.
pub async fn get_event(db: &Database, id: &str) -> Result<Option<EventRecord>, LessonflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            match conn.query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
                params![id],
                row_to_event,
            ) {
                Ok(e) => Ok(Some(e)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// All events with `name`, oldest first.
pub async fn list_by_name(db: &Database, name: &str) -> Result<Vec<EventRecord>, LessonflowError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM events WHERE name = ?1 ORDER BY seq"
            ))?;
            let rows = stmt.query_map(params![name], row_to_event)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Event count per queue status.
pub async fn counts(db: &Database) -> Result<Vec<(String, i64)>, LessonflowError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare("SELECT status, COUNT(*) FROM events GROUP BY status ORDER BY status")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}
