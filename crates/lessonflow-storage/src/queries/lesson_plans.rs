// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lesson plans and their per-section parts.

use lessonflow_core::{LessonPlanStatus, LessonflowError};
use rusqlite::params;
use rusqlite::types::Value;

use crate::database::{Database, map_tr_err};
use crate::models::{LessonPlan, LessonPlanPart, json_col, opt_json_col, status_col};
use crate::queries::status::advance_setting;

const PLAN_COLUMNS: &str = "id, lesson_id, subject_id, key_stage_id, content, status";
const PART_COLUMNS: &str = "id, lesson_plan_id, key, content, json, status";

fn row_to_plan(row: &rusqlite::Row<'_>) -> rusqlite::Result<LessonPlan> {
    Ok(LessonPlan {
        id: row.get(0)?,
        lesson_id: row.get(1)?,
        subject_id: row.get(2)?,
        key_stage_id: row.get(3)?,
        content: opt_json_col(row, 4)?,
        status: status_col(row, 5)?,
    })
}

fn row_to_part(row: &rusqlite::Row<'_>) -> rusqlite::Result<LessonPlanPart> {
    Ok(LessonPlanPart {
        id: row.get(0)?,
        lesson_plan_id: row.get(1)?,
        key: row.get(2)?,
        content: row.get(3)?,
        json: json_col(row, 4)?,
        status: status_col(row, 5)?,
    })
}

/// Create a PENDING plan for a lesson.
pub async fn create_plan(
    db: &Database,
    lesson_id: &str,
    subject_id: &str,
    key_stage_id: &str,
) -> Result<String, LessonflowError> {
    let id = uuid::Uuid::new_v4().to_string();
    let returned = id.clone();
    let lesson_id = lesson_id.to_string();
    let subject_id = subject_id.to_string();
    let key_stage_id = key_stage_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO lesson_plans (id, lesson_id, subject_id, key_stage_id)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, lesson_id, subject_id, key_stage_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(returned)
}

pub async fn get_plan(db: &Database, id: &str) -> Result<Option<LessonPlan>, LessonflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            match conn.query_row(
                &format!("SELECT {PLAN_COLUMNS} FROM lesson_plans WHERE id = ?1"),
                params![id],
                row_to_plan,
            ) {
                Ok(p) => Ok(Some(p)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// The plan for a lesson, if one was ever created.
pub async fn plan_for_lesson(
    db: &Database,
    lesson_id: &str,
) -> Result<Option<LessonPlan>, LessonflowError> {
    let lesson_id = lesson_id.to_string();
    db.connection()
        .call(move |conn| {
            match conn.query_row(
                &format!(
                    "SELECT {PLAN_COLUMNS} FROM lesson_plans
                     WHERE lesson_id = ?1 ORDER BY created_at, id LIMIT 1"
                ),
                params![lesson_id],
                row_to_plan,
            ) {
                Ok(p) => Ok(Some(p)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Store generated content and move the plan to GENERATED.
pub async fn store_generated_content(
    db: &Database,
    id: &str,
    content: &serde_json::Value,
) -> Result<(), LessonflowError> {
    let json = serde_json::to_string(content)?;
    advance_setting(
        db,
        id,
        LessonPlanStatus::Generated,
        vec![("content", Value::Text(json))],
    )
    .await?;
    Ok(())
}

pub async fn get_part(db: &Database, id: &str) -> Result<Option<LessonPlanPart>, LessonflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            match conn.query_row(
                &format!("SELECT {PART_COLUMNS} FROM lesson_plan_parts WHERE id = ?1"),
                params![id],
                row_to_part,
            ) {
                Ok(p) => Ok(Some(p)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Every part of a plan, ordered by creation.
pub async fn parts_for_plan(
    db: &Database,
    lesson_plan_id: &str,
) -> Result<Vec<LessonPlanPart>, LessonflowError> {
    let lesson_plan_id = lesson_plan_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PART_COLUMNS} FROM lesson_plan_parts
                 WHERE lesson_plan_id = ?1 ORDER BY rowid"
            ))?;
            let rows = stmt.query_map(params![lesson_plan_id], row_to_part)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Return the part for `(plan, key)`, creating it PENDING if missing.
pub async fn get_or_create_part(
    db: &Database,
    lesson_plan_id: &str,
    key: &str,
    content: &str,
    json: &serde_json::Value,
) -> Result<LessonPlanPart, LessonflowError> {
    let id = uuid::Uuid::new_v4().to_string();
    let lesson_plan_id = lesson_plan_id.to_string();
    let key = key.to_string();
    let content = content.to_string();
    let json = serde_json::to_string(json)?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO lesson_plan_parts (id, lesson_plan_id, key, content, json)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (lesson_plan_id, key) DO NOTHING",
                params![id, lesson_plan_id, key, content, json],
            )?;
            conn.query_row(
                &format!(
                    "SELECT {PART_COLUMNS} FROM lesson_plan_parts
                     WHERE lesson_plan_id = ?1 AND key = ?2"
                ),
                params![lesson_plan_id, key],
                row_to_part,
            )
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::{lessons, status};
    use crate::test_support::{sample_lesson, setup_db};
    use lessonflow_core::LessonPlanPartStatus;
    use serde_json::json;

    #[tokio::test]
    async fn parts_are_unique_per_key() {
        let (db, _dir) = setup_db().await;
        lessons::insert_lesson(&db, &sample_lesson("l1", "maths", "ks3")).await.unwrap();
        let plan = create_plan(&db, "l1", "maths", "ks3").await.unwrap();

        let first = get_or_create_part(&db, &plan, "cycle1", "Fractions", &json!("Fractions"))
            .await
            .unwrap();
        let again = get_or_create_part(&db, &plan, "cycle1", "changed", &json!("changed"))
            .await
            .unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(again.content, "Fractions");
        assert_eq!(again.status, LessonPlanPartStatus::Pending);
        assert_eq!(parts_for_plan(&db, &plan).await.unwrap().len(), 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn generated_content_requires_generating_status() {
        let (db, _dir) = setup_db().await;
        lessons::insert_lesson(&db, &sample_lesson("l1", "maths", "ks3")).await.unwrap();
        let plan = create_plan(&db, "l1", "maths", "ks3").await.unwrap();

        let err = store_generated_content(&db, &plan, &json!({"title": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, LessonflowError::IllegalTransition { .. }));

        status::advance(&db, &plan, LessonPlanStatus::Generating).await.unwrap();
        store_generated_content(&db, &plan, &json!({"title": "x"})).await.unwrap();
        let stored = get_plan(&db, &plan).await.unwrap().unwrap();
        assert_eq!(stored.status, LessonPlanStatus::Generated);
        assert_eq!(stored.content, Some(json!({"title": "x"})));
        db.close().await.unwrap();
    }
}
