// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lesson summaries.

use lessonflow_core::{LessonSummaryStatus, LessonflowError};
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::{LessonSummary, SummaryContent, json_col, status_col};

const SUMMARY_COLUMNS: &str =
    "id, lesson_id, content, topics, learning_objectives, concepts, keywords, status";

fn row_to_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<LessonSummary> {
    Ok(LessonSummary {
        id: row.get(0)?,
        lesson_id: row.get(1)?,
        content: SummaryContent {
            summary: row.get(2)?,
            topics: json_col(row, 3)?,
            learning_objectives: json_col(row, 4)?,
            concepts: json_col(row, 5)?,
            keywords: json_col(row, 6)?,
        },
        status: status_col(row, 7)?,
    })
}

/// Store a freshly generated summary. Rows are created GENERATED since the
/// model output is already in hand.
pub async fn insert_summary(
    db: &Database,
    lesson_id: &str,
    content: &SummaryContent,
) -> Result<String, LessonflowError> {
    let id = uuid::Uuid::new_v4().to_string();
    let returned = id.clone();
    let lesson_id = lesson_id.to_string();
    let topics = serde_json::to_string(&content.topics)?;
    let objectives = serde_json::to_string(&content.learning_objectives)?;
    let concepts = serde_json::to_string(&content.concepts)?;
    let keywords = serde_json::to_string(&content.keywords)?;
    let summary = content.summary.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO lesson_summaries
                 (id, lesson_id, content, topics, learning_objectives, concepts, keywords, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id,
                    lesson_id,
                    summary,
                    topics,
                    objectives,
                    concepts,
                    keywords,
                    LessonSummaryStatus::Generated.as_str()
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(returned)
}

pub async fn get_summary(db: &Database, id: &str) -> Result<Option<LessonSummary>, LessonflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            match conn.query_row(
                &format!("SELECT {SUMMARY_COLUMNS} FROM lesson_summaries WHERE id = ?1"),
                params![id],
                row_to_summary,
            ) {
                Ok(s) => Ok(Some(s)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// The oldest summary for a lesson.
pub async fn first_summary_for_lesson(
    db: &Database,
    lesson_id: &str,
) -> Result<Option<LessonSummary>, LessonflowError> {
    let lesson_id = lesson_id.to_string();
    db.connection()
        .call(move |conn| {
            match conn.query_row(
                &format!(
                    "SELECT {SUMMARY_COLUMNS} FROM lesson_summaries
                     WHERE lesson_id = ?1 ORDER BY created_at, id LIMIT 1"
                ),
                params![lesson_id],
                row_to_summary,
            ) {
                Ok(s) => Ok(Some(s)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}
