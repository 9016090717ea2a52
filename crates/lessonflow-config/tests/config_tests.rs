// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the configuration system.

use figment::Figment;
use figment::providers::{Format, Serialized, Toml};
use lessonflow_config::diagnostic::ConfigError;
use lessonflow_config::model::LessonflowConfig;
use lessonflow_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};
use serial_test::serial;

#[test]
fn full_file_deserializes() {
    let toml = r#"
[app]
name = "lessonflow-test"
log_level = "debug"

[storage]
database_path = "/tmp/lf.db"

[worker]
concurrency = 2
max_attempts = 5

[scanner]
page_size = 25

[openai]
api_key = "sk-test-123"
completion_model = "gpt-4o-mini"

[safety]
max_allowed_violations = 3
window_days = 7

[slack]
webhook_url = "https://hooks.slack.com/services/T/B/X"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.app.name, "lessonflow-test");
    assert_eq!(config.storage.database_path, "/tmp/lf.db");
    assert_eq!(config.worker.concurrency, 2);
    assert_eq!(config.worker.max_attempts, 5);
    assert_eq!(config.scanner.page_size, 25);
    assert_eq!(config.openai.api_key.as_deref(), Some("sk-test-123"));
    assert_eq!(config.openai.completion_model, "gpt-4o-mini");
    assert_eq!(config.safety.max_allowed_violations, 3);
    assert_eq!(config.safety.window_days, 7);
    // untouched sections keep their defaults
    assert_eq!(config.moderation.threshold, 0.1);
    assert_eq!(config.safety.tester_flag, "safety-testing");
    assert!(!config.generation.prompt_playback);
}

#[test]
fn safety_defaults_are_five_in_thirty_days() {
    let config = load_config_from_str("").unwrap();
    assert_eq!(config.safety.max_allowed_violations, 5);
    assert_eq!(config.safety.window_days, 30);
}

#[test]
fn unknown_key_gets_a_suggestion() {
    let toml = r#"
[safety]
windw_days = 10
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    let suggestion = errors.iter().find_map(|e| match e {
        ConfigError::UnknownKey { suggestion, .. } => suggestion.clone(),
        _ => None,
    });
    assert_eq!(suggestion.as_deref(), Some("window_days"));
}

#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[worker]
concurrency = "lots"
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("concurrency")))
    );
}

#[test]
fn semantic_validation_runs_after_parse() {
    let toml = r#"
[scanner]
page_size = 0
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("page_size")))
    );
}

#[test]
fn later_layers_override_earlier_ones() {
    let config: LessonflowConfig = Figment::new()
        .merge(Serialized::defaults(LessonflowConfig::default()))
        .merge(Toml::string("[safety]\nwindow_days = 14\n"))
        .merge(("safety.window_days", 21))
        .extract()
        .unwrap();
    assert_eq!(config.safety.window_days, 21);
}

fn write_config(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("lessonflow.toml");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
#[serial]
fn prefixed_env_overrides_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[worker]\nmax_attempts = 4\n");

    // SAFETY: env access is serialized across tests by #[serial].
    unsafe { std::env::set_var("LESSONFLOW_WORKER_MAX_ATTEMPTS", "7") };
    let config = load_and_validate_path(&path);
    unsafe { std::env::remove_var("LESSONFLOW_WORKER_MAX_ATTEMPTS") };

    assert_eq!(config.unwrap().worker.max_attempts, 7);
}

#[test]
#[serial]
fn legacy_safety_env_names_are_honoured() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "");

    // SAFETY: env access is serialized across tests by #[serial].
    unsafe {
        std::env::set_var("SAFETY_VIOLATIONS_MAX_ALLOWED", "3");
        std::env::set_var("SAFETY_VIOLATION_WINDOW_DAYS", "14");
    }
    let config = load_and_validate_path(&path);
    unsafe {
        std::env::remove_var("SAFETY_VIOLATIONS_MAX_ALLOWED");
        std::env::remove_var("SAFETY_VIOLATION_WINDOW_DAYS");
    }

    let config = config.unwrap();
    assert_eq!(config.safety.max_allowed_violations, 3);
    assert_eq!(config.safety.window_days, 14);
}

#[test]
#[serial]
fn prefixed_env_beats_legacy_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "");

    // SAFETY: env access is serialized across tests by #[serial].
    unsafe {
        std::env::set_var("SAFETY_VIOLATION_WINDOW_DAYS", "14");
        std::env::set_var("LESSONFLOW_SAFETY_WINDOW_DAYS", "45");
    }
    let config = load_and_validate_path(&path);
    unsafe {
        std::env::remove_var("SAFETY_VIOLATION_WINDOW_DAYS");
        std::env::remove_var("LESSONFLOW_SAFETY_WINDOW_DAYS");
    }

    assert_eq!(config.unwrap().safety.window_days, 45);
}

#[test]
#[serial]
fn legacy_prompt_playback_env_enables_playback() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "");

    // SAFETY: env access is serialized across tests by #[serial].
    unsafe { std::env::set_var("PROMPT_PLAYBACK_ENABLED", "true") };
    let config = load_and_validate_path(&path);
    unsafe { std::env::remove_var("PROMPT_PLAYBACK_ENABLED") };

    assert!(config.unwrap().generation.prompt_playback);
}

#[test]
fn prompt_playback_reads_from_file() {
    let config = load_config_from_str("[generation]\nprompt_playback = true\n").unwrap();
    assert!(config.generation.prompt_playback);
}
