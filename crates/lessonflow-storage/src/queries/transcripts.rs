// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lesson transcripts.

use lessonflow_core::LessonflowError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::{Transcript, status_col};

pub async fn insert_transcript(
    db: &Database,
    lesson_id: &str,
    content: &str,
) -> Result<String, LessonflowError> {
    let id = uuid::Uuid::new_v4().to_string();
    let lesson_id = lesson_id.to_string();
    let content = content.to_string();
    let returned = id.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO transcripts (id, lesson_id, content) VALUES (?1, ?2, ?3)",
                params![id, lesson_id, content],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(returned)
}

pub async fn get_transcript(db: &Database, id: &str) -> Result<Option<Transcript>, LessonflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            match conn.query_row(
                "SELECT id, lesson_id, content, status FROM transcripts WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Transcript {
                        id: row.get(0)?,
                        lesson_id: row.get(1)?,
                        content: row.get(2)?,
                        status: status_col(row, 3)?,
                    })
                },
            ) {
                Ok(t) => Ok(Some(t)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Full transcript text for a lesson, or `None` if it has none.
pub async fn transcript_text_for_lesson(
    db: &Database,
    lesson_id: &str,
) -> Result<Option<String>, LessonflowError> {
    let lesson_id = lesson_id.to_string();
    db.connection()
        .call(move |conn| {
            match conn.query_row(
                "SELECT content FROM transcripts WHERE lesson_id = ?1 ORDER BY created_at LIMIT 1",
                params![lesson_id],
                |row| row.get(0),
            ) {
                Ok(t) => Ok(Some(t)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Pending transcript ids for every lesson in a subject and key stage.
pub async fn pending_transcript_ids_for_subject(
    db: &Database,
    subject_id: &str,
    key_stage_id: &str,
) -> Result<Vec<String>, LessonflowError> {
    let subject_id = subject_id.to_string();
    let key_stage_id = key_stage_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT t.id FROM transcripts t JOIN lessons l ON l.id = t.lesson_id
                 WHERE l.subject_id = ?1 AND l.key_stage_id = ?2 AND t.status = 'PENDING'
                 ORDER BY t.id",
            )?;
            let rows = stmt.query_map(params![subject_id, key_stage_id], |row| row.get(0))?;
            rows.collect::<Result<Vec<String>, _>>()
        })
        .await
        .map_err(map_tr_err)
}
