// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status reads, checked status writes, and status-gated id pages shared by
//! every processable table.
//!
//! Writes read the current status and validate the move with
//! [`lessonflow_core::transition`] on the database thread, so an illegal move
//! never reaches the row. There is no version column: two workers racing on
//! one id both pass the check if they read before either writes, and the
//! later write wins.

use lessonflow_core::{
    GenerationStatus, LessonPlanPartStatus, LessonPlanStatus, LessonSummaryStatus,
    LessonflowError, QuizAnswerStatus, QuizQuestionStatus, SnippetStatus, StatusMachine,
    TranscriptStatus, transition,
};
use rusqlite::params;
use rusqlite::types::Value;

use crate::database::{Database, map_tr_err};
use crate::models::vec_to_blob;

/// A status enum backed by a table with `id`, `status`, and `updated_at`.
pub trait Tracked: StatusMachine + Send + Sync {
    const TABLE: &'static str;
}

impl Tracked for GenerationStatus {
    const TABLE: &'static str = "generations";
}
impl Tracked for LessonPlanStatus {
    const TABLE: &'static str = "lesson_plans";
}
impl Tracked for LessonPlanPartStatus {
    const TABLE: &'static str = "lesson_plan_parts";
}
impl Tracked for LessonSummaryStatus {
    const TABLE: &'static str = "lesson_summaries";
}
impl Tracked for QuizQuestionStatus {
    const TABLE: &'static str = "quiz_questions";
}
impl Tracked for QuizAnswerStatus {
    const TABLE: &'static str = "quiz_answers";
}
impl Tracked for SnippetStatus {
    const TABLE: &'static str = "snippets";
}
impl Tracked for TranscriptStatus {
    const TABLE: &'static str = "transcripts";
}

/// Current status of `id`, or `None` if the row does not exist.
pub async fn get_status<S: Tracked>(db: &Database, id: &str) -> Result<Option<S>, LessonflowError> {
    let id = id.to_string();
    let raw = db
        .connection()
        .call(move |conn| {
            let sql = format!("SELECT status FROM {} WHERE id = ?1", S::TABLE);
            match conn.query_row(&sql, params![id], |row| row.get::<_, String>(0)) {
                Ok(s) => Ok(Some(s)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)?;
    raw.map(|s| S::parse_stored(&s)).transpose()
}

/// Move `id` to `to`, rejecting moves its table does not allow.
pub async fn advance<S: Tracked>(db: &Database, id: &str, to: S) -> Result<S, LessonflowError> {
    advance_setting(db, id, to, Vec::new()).await
}

/// Store `embedding` and move `id` to `to` in one statement.
pub async fn advance_with_embedding<S: Tracked>(
    db: &Database,
    id: &str,
    to: S,
    embedding: &[f32],
) -> Result<S, LessonflowError> {
    advance_setting(db, id, to, vec![("embedding", Value::Blob(vec_to_blob(embedding)))]).await
}

/// Move `id` to `to` and set the extra columns in the same UPDATE.
///
/// Column names are compile-time constants supplied by this crate.
pub(crate) async fn advance_setting<S: Tracked>(
    db: &Database,
    id: &str,
    to: S,
    columns: Vec<(&'static str, Value)>,
) -> Result<S, LessonflowError> {
    let id = id.to_string();
    let target = to.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let current: Option<String> = match tx.query_row(
                &format!("SELECT status FROM {} WHERE id = ?1", S::TABLE),
                params![id],
                |row| row.get(0),
            ) {
                Ok(s) => Some(s),
                Err(rusqlite::Error::QueryReturnedNoRows) => None,
                Err(e) => return Err(e),
            };

            let Some(current) = current else {
                return Ok(Err(LessonflowError::not_found(S::ENTITY, id)));
            };
            let checked = S::parse_stored(&current).and_then(|from| transition(from, to));
            if let Err(e) = checked {
                return Ok(Err(e));
            }

            let mut sets = String::from("status = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')");
            let mut values: Vec<Value> = vec![Value::Text(target)];
            for (column, value) in columns {
                values.push(value);
                sets.push_str(&format!(", {column} = ?{}", values.len()));
            }
            values.push(Value::Text(id));
            let sql = format!("UPDATE {} SET {sets} WHERE id = ?{}", S::TABLE, values.len());
            tx.execute(&sql, rusqlite::params_from_iter(values))?;
            tx.commit()?;
            Ok(Ok(to))
        })
        .await
        .map_err(map_tr_err)?
}

/// One page of ids with `status`, ordered by id, strictly after `after`.
pub async fn ids_with_status<S: Tracked>(
    db: &Database,
    status: S,
    after: Option<&str>,
    limit: u32,
) -> Result<Vec<String>, LessonflowError> {
    let status = status.to_string();
    let after = after.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT id FROM {} WHERE status = ?1 AND (?2 IS NULL OR id > ?2) ORDER BY id LIMIT ?3",
                S::TABLE
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![status, after, limit], |row| row.get(0))?;
            rows.collect::<Result<Vec<String>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Row count per status value.
pub async fn count_by_status<S: Tracked>(db: &Database) -> Result<Vec<(S, i64)>, LessonflowError> {
    let raw = db
        .connection()
        .call(|conn| {
            let sql = format!(
                "SELECT status, COUNT(*) FROM {} GROUP BY status ORDER BY status",
                S::TABLE
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get(1)?)))?;
            rows.collect::<Result<Vec<(String, i64)>, _>>()
        })
        .await
        .map_err(map_tr_err)?;
    raw.into_iter()
        .map(|(s, n)| S::parse_stored(&s).map(|s| (s, n)))
        .collect()
}

/// Whether an embedding has been written for `id`.
pub async fn has_embedding<S: Tracked>(db: &Database, id: &str) -> Result<bool, LessonflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT COUNT(*) FROM {} WHERE id = ?1 AND embedding IS NOT NULL",
                S::TABLE
            );
            conn.query_row(&sql, params![id], |row| row.get::<_, i64>(0))
                .map(|n| n > 0)
        })
        .await
        .map_err(map_tr_err)
}
