// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::LessonflowConfig;

/// Check semantic constraints serde cannot express. Collects every failure
/// instead of stopping at the first.
pub fn validate_config(config: &LessonflowConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.worker.concurrency == 0 {
        fail("worker.concurrency must be at least 1".to_string());
    }

    if config.worker.max_attempts == 0 {
        fail("worker.max_attempts must be at least 1".to_string());
    }

    if config.worker.lock_timeout_secs == 0 {
        fail("worker.lock_timeout_secs must be at least 1".to_string());
    }

    if config.scanner.page_size == 0 {
        fail("scanner.page_size must be at least 1".to_string());
    }

    if config.safety.window_days == 0 {
        fail("safety.window_days must be at least 1".to_string());
    }

    if config.safety.tester_flag.trim().is_empty() {
        fail("safety.tester_flag must not be empty".to_string());
    }

    if !(0.0..=1.0).contains(&config.moderation.threshold) {
        fail(format!(
            "moderation.threshold must be between 0 and 1, got {}",
            config.moderation.threshold
        ));
    }

    if config.analytics.flush_at == 0 {
        fail("analytics.flush_at must be at least 1".to_string());
    }

    if config.analytics.flush_interval_secs == 0 {
        fail("analytics.flush_interval_secs must be at least 1".to_string());
    }

    for (key, url) in [
        ("openai.base_url", &config.openai.base_url),
        ("identity.base_url", &config.identity.base_url),
        ("analytics.host", &config.analytics.host),
    ] {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            fail(format!("{key} must be an http(s) URL, got `{url}`"));
        }
    }

    if let Some(url) = &config.slack.webhook_url {
        if !url.starts_with("https://") {
            fail("slack.webhook_url must be an https URL".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&LessonflowConfig::default()).is_ok());
    }

    #[test]
    fn zero_window_fails() {
        let mut config = LessonflowConfig::default();
        config.safety.window_days = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "safety.window_days"));
    }

    #[test]
    fn collects_every_failure() {
        let mut config = LessonflowConfig::default();
        config.storage.database_path = " ".into();
        config.scanner.page_size = 0;
        config.moderation.threshold = 1.5;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(has_error(&errors, "database_path"));
        assert!(has_error(&errors, "page_size"));
        assert!(has_error(&errors, "moderation.threshold"));
    }

    #[test]
    fn zero_analytics_flush_threshold_fails() {
        let mut config = LessonflowConfig::default();
        config.analytics.flush_at = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "analytics.flush_at"));
    }

    #[test]
    fn plain_http_webhook_is_rejected() {
        let mut config = LessonflowConfig::default();
        config.slack.webhook_url = Some("http://hooks.example.com/x".into());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "slack.webhook_url"));
    }
}
