// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `lessonflow health` command implementation.
//!
//! Opens the database and asks every adapter for its health.

use std::time::{Duration, Instant};

use lessonflow_config::LessonflowConfig;
use lessonflow_core::{HealthStatus, LessonflowError};
use lessonflow_storage::Database;

use crate::serve::Adapters;

/// Result of a single check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: HealthStatus,
    pub duration: Duration,
}

impl CheckResult {
    fn line(&self) -> String {
        let (label, detail) = match &self.status {
            HealthStatus::Healthy => ("PASS", String::new()),
            HealthStatus::Degraded(msg) => ("WARN", format!(": {msg}")),
            HealthStatus::Unhealthy(msg) => ("FAIL", format!(": {msg}")),
        };
        format!(
            "[{label}] {}{detail} ({}ms)",
            self.name,
            self.duration.as_millis()
        )
    }
}

async fn check_database(config: &LessonflowConfig) -> CheckResult {
    let start = Instant::now();
    let status =
        match Database::open_with(&config.storage.database_path, config.storage.wal_mode).await {
            Ok(db) => match db.close().await {
                Ok(()) => HealthStatus::Healthy,
                Err(e) => HealthStatus::Degraded(e.to_string()),
            },
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        };
    CheckResult {
        name: "database".into(),
        status,
        duration: start.elapsed(),
    }
}

/// Run the `lessonflow health` command. Fails if any check is unhealthy.
pub async fn run_health(config: &LessonflowConfig) -> Result<(), LessonflowError> {
    let mut results = vec![check_database(config).await];

    let adapters = Adapters::from_config(config)?;
    for adapter in adapters.all() {
        let start = Instant::now();
        let status = adapter
            .health_check()
            .await
            .unwrap_or_else(|e| HealthStatus::Unhealthy(e.to_string()));
        results.push(CheckResult {
            name: adapter.name().to_string(),
            status,
            duration: start.elapsed(),
        });
    }
    adapters.shutdown().await;

    for result in &results {
        println!("{}", result.line());
    }

    let failed = results
        .iter()
        .filter(|r| matches!(r.status, HealthStatus::Unhealthy(_)))
        .count();
    if failed > 0 {
        return Err(LessonflowError::Internal(format!(
            "{failed} health check(s) failed"
        )));
    }
    Ok(())
}
