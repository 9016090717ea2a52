// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded database migrations using refinery.

use lessonflow_core::LessonflowError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Run all pending migrations against the given connection.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), LessonflowError> {
    embedded::migrations::runner()
        .run(conn)
        .map_err(|e| LessonflowError::Storage {
            source: Box::new(e),
        })?;
    Ok(())
}
