// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcript snippets.

use lessonflow_core::LessonflowError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::{Snippet, snippet_variant, status_col};

/// Insert one PENDING snippet per chunk in a single transaction. Returns the
/// new ids in chunk order.
pub async fn insert_snippets(
    db: &Database,
    lesson_id: &str,
    transcript_id: Option<&str>,
    chunks: &[String],
) -> Result<Vec<String>, LessonflowError> {
    let lesson_id = lesson_id.to_string();
    let transcript_id = transcript_id.map(str::to_string);
    let rows: Vec<(String, String)> = chunks
        .iter()
        .map(|c| (uuid::Uuid::new_v4().to_string(), c.clone()))
        .collect();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO snippets (id, lesson_id, transcript_id, idx, content)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for (idx, (id, content)) in rows.iter().enumerate() {
                    stmt.execute(params![id, lesson_id, transcript_id, idx as i64, content])?;
                }
            }
            tx.commit()?;
            Ok(rows.into_iter().map(|(id, _)| id).collect())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_snippet(db: &Database, id: &str) -> Result<Option<Snippet>, LessonflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            match conn.query_row(
                "SELECT id, lesson_id, transcript_id, question_id, variant, idx, content, status
                 FROM snippets WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Snippet {
                        id: row.get(0)?,
                        lesson_id: row.get(1)?,
                        transcript_id: row.get(2)?,
                        question_id: row.get(3)?,
                        variant: row.get(4)?,
                        idx: row.get(5)?,
                        content: row.get(6)?,
                        status: status_col(row, 7)?,
                    })
                },
            ) {
                Ok(s) => Ok(Some(s)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Quiz question ids with no snippet yet, ordered by id, after `after`.
pub async fn question_ids_without_snippet(
    db: &Database,
    after: Option<&str>,
    limit: u32,
) -> Result<Vec<String>, LessonflowError> {
    let after = after.unwrap_or_default().to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT q.id FROM quiz_questions q
                 WHERE q.id > ?1
                   AND NOT EXISTS (SELECT 1 FROM snippets s WHERE s.question_id = q.id)
                 ORDER BY q.id LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![after, limit], |row| row.get(0))?;
            rows.collect::<Result<Vec<String>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a PENDING question-and-answer snippet unless the question already
/// has one. Returns the new id, or `None` when nothing was inserted.
pub async fn insert_question_snippet(
    db: &Database,
    lesson_id: &str,
    question_id: &str,
    content: &str,
) -> Result<Option<String>, LessonflowError> {
    let id = uuid::Uuid::new_v4().to_string();
    let lesson_id = lesson_id.to_string();
    let question_id = question_id.to_string();
    let content = content.to_string();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO snippets (id, lesson_id, question_id, variant, idx, content)
                 SELECT ?1, ?2, ?3, ?4, 0, ?5
                 WHERE NOT EXISTS (SELECT 1 FROM snippets WHERE question_id = ?3)",
                params![
                    id,
                    lesson_id,
                    question_id,
                    snippet_variant::QUESTION_AND_ANSWER,
                    content
                ],
            )?;
            Ok((inserted == 1).then_some(id))
        })
        .await
        .map_err(map_tr_err)
}

/// Snippet ids created from one transcript, in chunk order.
pub async fn snippet_ids_for_transcript(
    db: &Database,
    transcript_id: &str,
) -> Result<Vec<String>, LessonflowError> {
    let transcript_id = transcript_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare("SELECT id FROM snippets WHERE transcript_id = ?1 ORDER BY idx")?;
            let rows = stmt.query_map(params![transcript_id], |row| row.get(0))?;
            rows.collect::<Result<Vec<String>, _>>()
        })
        .await
        .map_err(map_tr_err)
}
