// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slack incoming-webhook notifier.
//!
//! Messages are posted as plain `{"text": ...}` payloads. When no webhook is
//! configured the notifier logs the message instead.

use std::time::Duration;

use async_trait::async_trait;
use lessonflow_config::LessonflowConfig;
use lessonflow_core::error::LessonflowError;
use lessonflow_core::traits::{NotifierAdapter, PluginAdapter};
use lessonflow_core::types::{AdapterType, HealthStatus, Notification};
use tracing::{debug, info};

pub struct SlackNotifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl SlackNotifier {
    pub fn new(config: &LessonflowConfig) -> Result<Self, LessonflowError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LessonflowError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            webhook_url: config.slack.webhook_url.clone().filter(|u| !u.is_empty()),
        })
    }
}

#[async_trait]
impl PluginAdapter for SlackNotifier {
    fn name(&self) -> &str {
        "slack"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notifier
    }

    async fn health_check(&self) -> Result<HealthStatus, LessonflowError> {
        match self.webhook_url {
            Some(_) => Ok(HealthStatus::Healthy),
            None => Ok(HealthStatus::Degraded("no webhook configured".into())),
        }
    }

    async fn shutdown(&self) -> Result<(), LessonflowError> {
        Ok(())
    }
}

#[async_trait]
impl NotifierAdapter for SlackNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), LessonflowError> {
        let Some(url) = &self.webhook_url else {
            info!(text = %notification.text, "slack webhook not configured, notification logged");
            return Ok(());
        };

        let response = self
            .client
            .post(url)
            .json(&notification)
            .send()
            .await
            .map_err(|e| LessonflowError::Provider {
                message: format!("slack webhook request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LessonflowError::Provider {
                message: format!("slack webhook returned {status}: {body}"),
                source: None,
            });
        }
        debug!("slack notification delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracing_test::traced_test;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notifier(url: Option<String>) -> SlackNotifier {
        let mut config = LessonflowConfig::default();
        config.slack.webhook_url = url;
        SlackNotifier::new(&config).unwrap()
    }

    #[tokio::test]
    async fn posts_plain_text_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/T0/B0/x"))
            .and(body_json(json!({"text": "User banned: u1"})))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        notifier(Some(format!("{}/services/T0/B0/x", server.uri())))
            .notify(Notification {
                text: "User banned: u1".into(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn webhook_rejection_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no_service"))
            .mount(&server)
            .await;

        let err = notifier(Some(server.uri()))
            .notify(Notification { text: "x".into() })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no_service"));
    }

    #[tokio::test]
    #[traced_test]
    async fn unconfigured_webhook_logs_instead() {
        notifier(None)
            .notify(Notification {
                text: "rate limit hit".into(),
            })
            .await
            .unwrap();
        assert!(logs_contain("rate limit hit"));
    }
}
