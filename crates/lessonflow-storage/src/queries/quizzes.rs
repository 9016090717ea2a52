// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quiz questions and answers.

use lessonflow_core::LessonflowError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::{QuizAnswer, QuizQuestion, status_col};

pub async fn insert_question(
    db: &Database,
    lesson_id: &str,
    question: &str,
) -> Result<String, LessonflowError> {
    let id = uuid::Uuid::new_v4().to_string();
    let returned = id.clone();
    let lesson_id = lesson_id.to_string();
    let question = question.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO quiz_questions (id, lesson_id, question) VALUES (?1, ?2, ?3)",
                params![id, lesson_id, question],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(returned)
}

/// Insert the correct answer to a question.
pub async fn insert_answer(
    db: &Database,
    question_id: &str,
    answer: &str,
) -> Result<String, LessonflowError> {
    insert_answer_row(db, question_id, answer, false).await
}

/// Insert a wrong answer offered alongside the correct one.
pub async fn insert_distractor(
    db: &Database,
    question_id: &str,
    answer: &str,
) -> Result<String, LessonflowError> {
    insert_answer_row(db, question_id, answer, true).await
}

async fn insert_answer_row(
    db: &Database,
    question_id: &str,
    answer: &str,
    distractor: bool,
) -> Result<String, LessonflowError> {
    let id = uuid::Uuid::new_v4().to_string();
    let returned = id.clone();
    let question_id = question_id.to_string();
    let answer = answer.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO quiz_answers (id, question_id, answer, distractor)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, question_id, answer, distractor],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(returned)
}

/// Text of the first non-distractor answer to a question.
pub async fn correct_answer(
    db: &Database,
    question_id: &str,
) -> Result<Option<String>, LessonflowError> {
    let question_id = question_id.to_string();
    db.connection()
        .call(move |conn| {
            match conn.query_row(
                "SELECT answer FROM quiz_answers
                 WHERE question_id = ?1 AND distractor = 0
                 ORDER BY created_at, id LIMIT 1",
                params![question_id],
                |row| row.get(0),
            ) {
                Ok(a) => Ok(Some(a)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_question(db: &Database, id: &str) -> Result<Option<QuizQuestion>, LessonflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            match conn.query_row(
                "SELECT id, lesson_id, question, status FROM quiz_questions WHERE id = ?1",
                params![id],
                |row| {
                    Ok(QuizQuestion {
                        id: row.get(0)?,
                        lesson_id: row.get(1)?,
                        question: row.get(2)?,
                        status: status_col(row, 3)?,
                    })
                },
            ) {
                Ok(q) => Ok(Some(q)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_answer(db: &Database, id: &str) -> Result<Option<QuizAnswer>, LessonflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            match conn.query_row(
                "SELECT id, question_id, answer, status FROM quiz_answers WHERE id = ?1",
                params![id],
                |row| {
                    Ok(QuizAnswer {
                        id: row.get(0)?,
                        question_id: row.get(1)?,
                        answer: row.get(2)?,
                        status: status_col(row, 3)?,
                    })
                },
            ) {
                Ok(a) => Ok(Some(a)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Pending question ids and pending answer ids belonging to one lesson.
pub async fn pending_quiz_ids_for_lesson(
    db: &Database,
    lesson_id: &str,
) -> Result<(Vec<String>, Vec<String>), LessonflowError> {
    let lesson_id = lesson_id.to_string();
    db.connection()
        .call(move |conn| {
            let questions = {
                let mut stmt = conn.prepare(
                    "SELECT id FROM quiz_questions
                     WHERE lesson_id = ?1 AND status = 'PENDING' ORDER BY id",
                )?;
                let rows = stmt.query_map(params![lesson_id], |row| row.get(0))?;
                rows.collect::<Result<Vec<String>, _>>()?
            };
            let answers = {
                let mut stmt = conn.prepare(
                    "SELECT a.id FROM quiz_answers a JOIN quiz_questions q ON q.id = a.question_id
                     WHERE q.lesson_id = ?1 AND a.status = 'PENDING' ORDER BY a.id",
                )?;
                let rows = stmt.query_map(params![lesson_id], |row| row.get(0))?;
                rows.collect::<Result<Vec<String>, _>>()?
            };
            Ok((questions, answers))
        })
        .await
        .map_err(map_tr_err)
}
