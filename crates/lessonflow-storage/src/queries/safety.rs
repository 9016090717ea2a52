// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Safety violation rows.

use lessonflow_core::LessonflowError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::SafetyViolationRecord;

/// Insert a violation unless the user already has one for the same record.
/// Returns the id of the stored row, which is the existing one on conflict.
pub async fn insert_violation(
    db: &Database,
    violation: &SafetyViolationRecord,
) -> Result<String, LessonflowError> {
    let v = violation.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO safety_violations
                 (id, user_id, user_action, detection_source, record_type, record_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(user_id, record_type, record_id) DO NOTHING",
                params![
                    v.id,
                    v.user_id,
                    v.user_action,
                    v.detection_source,
                    v.record_type,
                    v.record_id,
                    v.created_at
                ],
            )?;
            conn.query_row(
                "SELECT id FROM safety_violations
                 WHERE user_id = ?1 AND record_type = ?2 AND record_id = ?3",
                params![v.user_id, v.record_type, v.record_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Violations for `user_id` created at or after `since`.
pub async fn count_since(db: &Database, user_id: &str, since: &str) -> Result<i64, LessonflowError> {
    let user_id = user_id.to_string();
    let since = since.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM safety_violations WHERE user_id = ?1 AND created_at >= ?2",
                params![user_id, since],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Delete one violation. Returns the user it belonged to.
pub async fn delete_by_id(db: &Database, id: &str) -> Result<Option<String>, LessonflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            match conn.query_row(
                "DELETE FROM safety_violations WHERE id = ?1 RETURNING user_id",
                params![id],
                |row| row.get(0),
            ) {
                Ok(u) => Ok(Some(u)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Delete every violation attached to a record. Returns the distinct users
/// affected.
pub async fn delete_by_record_id(
    db: &Database,
    record_id: &str,
) -> Result<Vec<String>, LessonflowError> {
    let record_id = record_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let users = {
                let mut stmt = tx.prepare(
                    "SELECT DISTINCT user_id FROM safety_violations WHERE record_id = ?1
                     ORDER BY user_id",
                )?;
                let rows = stmt.query_map(params![record_id], |row| row.get(0))?;
                rows.collect::<Result<Vec<String>, _>>()?
            };
            tx.execute(
                "DELETE FROM safety_violations WHERE record_id = ?1",
                params![record_id],
            )?;
            tx.commit()?;
            Ok(users)
        })
        .await
        .map_err(map_tr_err)
}

/// All violations for a user, newest first.
pub async fn list_for_user(
    db: &Database,
    user_id: &str,
) -> Result<Vec<SafetyViolationRecord>, LessonflowError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, user_action, detection_source, record_type, record_id, created_at
                 FROM safety_violations WHERE user_id = ?1 ORDER BY created_at DESC",
            )?;
            let rows = stmt.query_map(params![user_id], |row| {
                Ok(SafetyViolationRecord {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    user_action: row.get(2)?,
                    detection_source: row.get(3)?,
                    record_type: row.get(4)?,
                    record_id: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}
