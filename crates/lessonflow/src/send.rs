// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `lessonflow send` and `lessonflow events`.

use lessonflow_bus::EventName;
use lessonflow_config::LessonflowConfig;
use lessonflow_core::LessonflowError;
use serde_json::Value;
use strum::IntoEnumIterator;

use crate::serve::open_queue;

/// Parse a `--data` argument into a JSON payload.
fn parse_payload(event: &str, data: &str) -> Result<Value, LessonflowError> {
    serde_json::from_str(data).map_err(|e| LessonflowError::Validation {
        event: event.to_string(),
        message: format!("payload is not JSON: {e}"),
    })
}

/// Validate and enqueue one event, printing its id.
///
/// The event is only queued; a running `lessonflow serve` picks it up.
pub async fn run_send(
    config: &LessonflowConfig,
    event: &str,
    data: &str,
    user: Option<&str>,
) -> Result<(), LessonflowError> {
    let payload = parse_payload(event, data)?;
    let (db, bus) = open_queue(config).await?;
    let sent = bus.send_raw(event, payload, user).await;
    db.close().await?;
    println!("{}", sent?);
    Ok(())
}

fn catalog_lines() -> Vec<String> {
    EventName::iter()
        .map(|name| {
            if name.requires_user() {
                format!("{name}  (requires user)")
            } else {
                name.to_string()
            }
        })
        .collect()
}

pub fn print_catalog() {
    for line in catalog_lines() {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &tempfile::TempDir) -> LessonflowConfig {
        let mut config = LessonflowConfig::default();
        config.storage.database_path = dir.path().join("lf.db").display().to_string();
        config
    }

    #[test]
    fn rejects_malformed_payload() {
        let err = parse_payload("app/lesson.summarise", "{lessonId").unwrap_err();
        assert!(matches!(err, LessonflowError::Validation { .. }));
    }

    #[test]
    fn catalog_marks_user_events() {
        let lines = catalog_lines();
        assert!(lines.contains(&"app/healthcheck".to_string()));
        assert!(lines.contains(&"app/generation.requested  (requires user)".to_string()));
    }

    #[tokio::test]
    async fn send_enqueues_valid_event() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        run_send(&config, "app/lesson.summarise", r#"{"lessonId":"l1"}"#, None)
            .await
            .unwrap();

        let (db, _bus) = open_queue(&config).await.unwrap();
        let counts = lessonflow_storage::queries::events::counts(&db).await.unwrap();
        assert_eq!(counts, vec![("pending".to_string(), 1)]);
    }

    #[tokio::test]
    async fn send_rejects_unknown_event() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let err = run_send(&config, "app/lesson.explode", "{}", None)
            .await
            .unwrap_err();
        assert!(matches!(err, LessonflowError::Validation { .. }));
    }

    #[tokio::test]
    async fn send_requires_user_for_ban_notice() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let err = run_send(&config, "app/slack.notifyUserBan", "{}", None)
            .await
            .unwrap_err();
        assert!(matches!(err, LessonflowError::Validation { .. }));
    }
}
