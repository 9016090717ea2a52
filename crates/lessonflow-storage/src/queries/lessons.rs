// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lesson reads and subject-scoped lookups.

use lessonflow_core::LessonflowError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::Lesson;

const LESSON_COLUMNS: &str = "id, slug, title, subject_id, key_stage_id, is_new_lesson";

fn row_to_lesson(row: &rusqlite::Row<'_>) -> rusqlite::Result<Lesson> {
    Ok(Lesson {
        id: row.get(0)?,
        slug: row.get(1)?,
        title: row.get(2)?,
        subject_id: row.get(3)?,
        key_stage_id: row.get(4)?,
        is_new_lesson: row.get(5)?,
    })
}

pub async fn insert_lesson(db: &Database, lesson: &Lesson) -> Result<(), LessonflowError> {
    let lesson = lesson.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO lessons (id, slug, title, subject_id, key_stage_id, is_new_lesson)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    lesson.id,
                    lesson.slug,
                    lesson.title,
                    lesson.subject_id,
                    lesson.key_stage_id,
                    lesson.is_new_lesson
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_lesson(db: &Database, id: &str) -> Result<Option<Lesson>, LessonflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            match conn.query_row(
                &format!("SELECT {LESSON_COLUMNS} FROM lessons WHERE id = ?1"),
                params![id],
                row_to_lesson,
            ) {
                Ok(l) => Ok(Some(l)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Every lesson in a subject and key stage, ordered by id.
pub async fn lessons_for_subject(
    db: &Database,
    subject_id: &str,
    key_stage_id: &str,
) -> Result<Vec<Lesson>, LessonflowError> {
    let subject_id = subject_id.to_string();
    let key_stage_id = key_stage_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LESSON_COLUMNS} FROM lessons
                 WHERE subject_id = ?1 AND key_stage_id = ?2 ORDER BY id"
            ))?;
            let rows = stmt.query_map(params![subject_id, key_stage_id], row_to_lesson)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Ids of lessons in a subject and key stage that have no lesson plan yet.
pub async fn lesson_ids_without_plan(
    db: &Database,
    subject_id: &str,
    key_stage_id: &str,
) -> Result<Vec<String>, LessonflowError> {
    let subject_id = subject_id.to_string();
    let key_stage_id = key_stage_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT l.id FROM lessons l
                 WHERE l.subject_id = ?1 AND l.key_stage_id = ?2
                   AND NOT EXISTS (SELECT 1 FROM lesson_plans p WHERE p.lesson_id = l.id)
                 ORDER BY l.id",
            )?;
            let rows = stmt.query_map(params![subject_id, key_stage_id], |row| row.get(0))?;
            rows.collect::<Result<Vec<String>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// One page of lessons without a summary, keyed on id.
pub async fn lesson_ids_without_summary(
    db: &Database,
    new_lessons_only: bool,
    after: Option<&str>,
    limit: u32,
) -> Result<Vec<String>, LessonflowError> {
    let after = after.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT l.id FROM lessons l
                 WHERE NOT EXISTS (SELECT 1 FROM lesson_summaries s WHERE s.lesson_id = l.id)
                   AND (?1 = 0 OR l.is_new_lesson = 1)
                   AND (?2 IS NULL OR l.id > ?2)
                 ORDER BY l.id LIMIT ?3",
            )?;
            let rows = stmt.query_map(params![new_lessons_only, after, limit], |row| row.get(0))?;
            rows.collect::<Result<Vec<String>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::lesson_plans;
    use crate::test_support::{sample_lesson, setup_db};

    #[tokio::test]
    async fn lessons_without_plan_excludes_planned_ones() {
        let (db, _dir) = setup_db().await;
        for id in ["l1", "l2", "l3"] {
            insert_lesson(&db, &sample_lesson(id, "maths", "ks3")).await.unwrap();
        }
        insert_lesson(&db, &sample_lesson("other", "history", "ks3")).await.unwrap();
        lesson_plans::create_plan(&db, "l2", "maths", "ks3").await.unwrap();

        let ids = lesson_ids_without_plan(&db, "maths", "ks3").await.unwrap();
        assert_eq!(ids, vec!["l1", "l3"]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn new_only_filter_applies() {
        let (db, _dir) = setup_db().await;
        insert_lesson(&db, &sample_lesson("l1", "maths", "ks3")).await.unwrap();
        let mut fresh = sample_lesson("l2", "maths", "ks3");
        fresh.is_new_lesson = true;
        insert_lesson(&db, &fresh).await.unwrap();

        assert_eq!(
            lesson_ids_without_summary(&db, true, None, 10).await.unwrap(),
            vec!["l2"]
        );
        assert_eq!(
            lesson_ids_without_summary(&db, false, None, 10).await.unwrap(),
            vec!["l1", "l2"]
        );
        db.close().await.unwrap();
    }
}
