// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `lessonflow status` command implementation.
//!
//! Reads live counts straight from the database; the `statistics` table
//! written by `app/stats.recalculate` is not consulted.

use std::collections::BTreeMap;

use lessonflow_config::LessonflowConfig;
use lessonflow_core::LessonflowError;
use lessonflow_pipeline::functions::stats::collect_statistics;
use lessonflow_storage::Database;
use lessonflow_storage::queries::events;
use serde::Serialize;

/// Structured status output for `--json` mode.
#[derive(Debug, Default, Serialize)]
pub struct StatusReport {
    /// Event queue rows by queue status.
    pub queue: BTreeMap<String, i64>,
    /// Record rows keyed `<entity>.<STATUS>`.
    pub records: BTreeMap<String, i64>,
}

impl StatusReport {
    pub async fn collect(db: &Database) -> Result<Self, LessonflowError> {
        Ok(Self {
            queue: events::counts(db).await?.into_iter().collect(),
            records: collect_statistics(db).await?.into_iter().collect(),
        })
    }

    fn render(&self) -> String {
        let mut out = String::from("Queue:\n");
        if self.queue.is_empty() {
            out.push_str("  (empty)\n");
        }
        for (status, count) in &self.queue {
            out.push_str(&format!("  {status:<12} {count}\n"));
        }
        out.push_str("Records:\n");
        if self.records.is_empty() {
            out.push_str("  (none)\n");
        }
        for (key, count) in &self.records {
            out.push_str(&format!("  {key:<32} {count}\n"));
        }
        out
    }
}

/// Run the `lessonflow status` command.
///
/// If `--json` is passed, outputs structured JSON for scripting.
pub async fn run_status(config: &LessonflowConfig, json: bool) -> Result<(), LessonflowError> {
    let db = Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?;
    let report = StatusReport::collect(&db).await;
    db.close().await?;
    let report = report?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render());
    }
    Ok(())
}
