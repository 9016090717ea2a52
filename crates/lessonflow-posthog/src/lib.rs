// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PostHog analytics adapter.
//!
//! Captured and identify events are buffered in memory and delivered in one
//! `/batch/` call on [`AnalyticsAdapter::flush`], or as soon as the buffer
//! reaches `analytics.flush_at` events. Feature flags are resolved
//! live through `/decide/`. Without an API key the adapter is disabled:
//! capture is a no-op and every flag reads as off.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use lessonflow_config::LessonflowConfig;
use lessonflow_core::error::LessonflowError;
use lessonflow_core::traits::{AnalyticsAdapter, PluginAdapter};
use lessonflow_core::types::{AdapterType, AnalyticsEvent, HealthStatus};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize)]
struct BatchItem {
    event: String,
    distinct_id: String,
    properties: Value,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct BatchBody<'a> {
    api_key: &'a str,
    batch: &'a [BatchItem],
}

#[derive(Debug, Deserialize)]
struct DecideResponse {
    #[serde(default, rename = "featureFlags")]
    feature_flags: serde_json::Map<String, Value>,
}

pub struct PostHogAnalytics {
    client: reqwest::Client,
    host: String,
    api_key: Option<String>,
    flush_at: usize,
    flush_interval: Duration,
    buffer: Mutex<Vec<BatchItem>>,
}

impl PostHogAnalytics {
    pub fn new(config: &LessonflowConfig) -> Result<Self, LessonflowError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LessonflowError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let api_key = config.analytics.api_key.clone().filter(|k| !k.is_empty());
        if api_key.is_none() {
            info!("analytics disabled: no analytics.api_key configured");
        }

        Ok(Self {
            client,
            host: config.analytics.host.trim_end_matches('/').to_string(),
            api_key,
            flush_at: config.analytics.flush_at.max(1),
            flush_interval: Duration::from_secs(config.analytics.flush_interval_secs.max(1)),
            buffer: Mutex::new(Vec::new()),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// Events waiting for the next flush.
    pub async fn pending(&self) -> usize {
        self.buffer.lock().await.len()
    }

    /// How often a long-running process should call `flush`.
    pub fn flush_interval(&self) -> Duration {
        self.flush_interval
    }

    /// Buffer an event, flushing once the buffer is full. A failed flush
    /// keeps the events for the next attempt and is not reported to the
    /// caller.
    async fn push(&self, event: String, distinct_id: String, properties: Value) {
        if !self.is_enabled() {
            return;
        }
        let full = {
            let mut buffer = self.buffer.lock().await;
            buffer.push(BatchItem {
                event,
                distinct_id,
                properties,
                timestamp: Utc::now().to_rfc3339(),
            });
            buffer.len() >= self.flush_at
        };
        if full {
            if let Err(e) = self.flush().await {
                warn!(error = %e, "analytics flush on full buffer failed");
            }
        }
    }
}

#[async_trait]
impl PluginAdapter for PostHogAnalytics {
    fn name(&self) -> &str {
        "posthog"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Analytics
    }

    async fn health_check(&self) -> Result<HealthStatus, LessonflowError> {
        if self.is_enabled() {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded("no API key configured".into()))
        }
    }

    async fn shutdown(&self) -> Result<(), LessonflowError> {
        self.flush().await
    }
}

#[async_trait]
impl AnalyticsAdapter for PostHogAnalytics {
    async fn capture(&self, event: AnalyticsEvent) -> Result<(), LessonflowError> {
        self.push(event.event, event.distinct_id, event.properties).await;
        Ok(())
    }

    async fn identify(&self, distinct_id: &str, properties: Value) -> Result<(), LessonflowError> {
        self.push(
            "$identify".to_string(),
            distinct_id.to_string(),
            json!({ "$set": properties }),
        )
        .await;
        Ok(())
    }

    async fn is_feature_enabled(&self, flag: &str, distinct_id: &str) -> Result<bool, LessonflowError> {
        let Some(api_key) = &self.api_key else {
            return Ok(false);
        };
        let response = self
            .client
            .post(format!("{}/decide/?v=3", self.host))
            .json(&json!({ "api_key": api_key, "distinct_id": distinct_id }))
            .send()
            .await
            .map_err(|e| LessonflowError::Provider {
                message: format!("feature flag request failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        if !response.status().is_success() {
            return Err(LessonflowError::Provider {
                message: format!("feature flag endpoint returned {}", response.status()),
                source: None,
            });
        }
        let decided: DecideResponse = response.json().await.map_err(|e| LessonflowError::Provider {
            message: format!("failed to parse feature flags: {e}"),
            source: Some(Box::new(e)),
        })?;

        // Multivariate flags come back as their variant name.
        let enabled = match decided.feature_flags.get(flag) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => !s.is_empty(),
            _ => false,
        };
        debug!(flag, distinct_id, enabled, "feature flag resolved");
        Ok(enabled)
    }

    async fn flush(&self) -> Result<(), LessonflowError> {
        let Some(api_key) = &self.api_key else {
            return Ok(());
        };
        let batch = std::mem::take(&mut *self.buffer.lock().await);
        if batch.is_empty() {
            return Ok(());
        }

        let result = self
            .client
            .post(format!("{}/batch/", self.host))
            .json(&BatchBody {
                api_key,
                batch: &batch,
            })
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!(events = batch.len(), "analytics flushed");
                Ok(())
            }
            Ok(response) => {
                let status = response.status();
                warn!(status = %status, events = batch.len(), "analytics flush rejected");
                self.buffer.lock().await.extend(batch);
                Err(LessonflowError::Provider {
                    message: format!("analytics batch returned {status}"),
                    source: None,
                })
            }
            Err(e) => {
                self.buffer.lock().await.extend(batch);
                Err(LessonflowError::Provider {
                    message: format!("analytics flush failed: {e}"),
                    source: Some(Box::new(e)),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn analytics(uri: &str, key: Option<&str>) -> PostHogAnalytics {
        analytics_flushing_at(uri, key, 20)
    }

    fn analytics_flushing_at(uri: &str, key: Option<&str>, flush_at: usize) -> PostHogAnalytics {
        let mut config = LessonflowConfig::default();
        config.analytics.flush_at = flush_at;
        config.analytics.api_key = key.map(str::to_string);
        config.analytics.host = uri.to_string();
        PostHogAnalytics::new(&config).unwrap()
    }

    #[tokio::test]
    async fn flush_sends_buffered_events_in_one_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/batch/"))
            .and(body_partial_json(json!({"api_key": "phc_test"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let analytics = analytics(&server.uri(), Some("phc_test"));
        analytics
            .capture(AnalyticsEvent::new("u1", "user_banned", json!({})))
            .await
            .unwrap();
        analytics.identify("u1", json!({"banned": true})).await.unwrap();
        assert_eq!(analytics.pending().await, 2);

        analytics.flush().await.unwrap();
        assert_eq!(analytics.pending().await, 0);
    }

    #[tokio::test]
    async fn full_buffer_flushes_without_explicit_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/batch/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let analytics = analytics_flushing_at(&server.uri(), Some("phc_test"), 3);
        for i in 0..2 {
            analytics
                .capture(AnalyticsEvent::new("u1", format!("event {i}"), json!({})))
                .await
                .unwrap();
        }
        assert_eq!(analytics.pending().await, 2);

        analytics
            .capture(AnalyticsEvent::new("u1", "event 2", json!({})))
            .await
            .unwrap();
        assert_eq!(analytics.pending().await, 0);
    }

    #[tokio::test]
    async fn rejected_flush_on_full_buffer_keeps_capture_ok() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let analytics = analytics_flushing_at(&server.uri(), Some("phc_test"), 1);
        analytics
            .capture(AnalyticsEvent::new("u1", "x", json!({})))
            .await
            .unwrap();
        assert_eq!(analytics.pending().await, 1);
    }

    #[tokio::test]
    async fn failed_flush_keeps_events() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let analytics = analytics(&server.uri(), Some("phc_test"));
        analytics
            .capture(AnalyticsEvent::new("u1", "x", json!({})))
            .await
            .unwrap();
        assert!(analytics.flush().await.is_err());
        assert_eq!(analytics.pending().await, 1);
    }

    #[tokio::test]
    async fn feature_flag_reads_decide_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/decide/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "featureFlags": {"safety-testing": true, "beta": "variant-a", "off": false}
            })))
            .mount(&server)
            .await;

        let analytics = analytics(&server.uri(), Some("phc_test"));
        assert!(analytics.is_feature_enabled("safety-testing", "u1").await.unwrap());
        assert!(analytics.is_feature_enabled("beta", "u1").await.unwrap());
        assert!(!analytics.is_feature_enabled("off", "u1").await.unwrap());
        assert!(!analytics.is_feature_enabled("missing", "u1").await.unwrap());
    }

    #[tokio::test]
    async fn disabled_adapter_makes_no_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let analytics = analytics(&server.uri(), None);
        analytics
            .capture(AnalyticsEvent::new("u1", "x", json!({})))
            .await
            .unwrap();
        analytics.flush().await.unwrap();
        assert!(!analytics.is_feature_enabled("safety-testing", "u1").await.unwrap());
    }
}
