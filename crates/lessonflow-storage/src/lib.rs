// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Lessonflow.
//!
//! WAL-mode SQLite with embedded migrations, a single-writer connection via
//! `tokio-rusqlite`, the durable event queue, memoized step results, and
//! typed queries for lesson content, generations, and safety violations.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::Database;
pub use models::*;
pub use queries::status::Tracked;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::database::Database;
    use crate::models::Lesson;

    pub async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    pub fn sample_lesson(id: &str, subject: &str, key_stage: &str) -> Lesson {
        Lesson {
            id: id.to_string(),
            slug: format!("{id}-slug"),
            title: format!("Lesson {id}"),
            subject_id: subject.to_string(),
            key_stage_id: key_stage.to_string(),
            is_new_lesson: false,
        }
    }
}
