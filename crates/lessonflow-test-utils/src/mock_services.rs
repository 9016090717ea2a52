// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock identity, analytics, and notifier adapters for deterministic testing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use lessonflow_core::types::{AdapterType, AnalyticsEvent, HealthStatus, IdentityUser, Notification};
use lessonflow_core::{
    AnalyticsAdapter, IdentityAdapter, LessonflowError, NotifierAdapter, PluginAdapter,
};
use tokio::sync::Mutex;

macro_rules! mock_adapter {
    ($ty:ty, $name:literal, $kind:expr) => {
        #[async_trait]
        impl PluginAdapter for $ty {
            fn name(&self) -> &str {
                $name
            }

            fn version(&self) -> semver::Version {
                semver::Version::new(0, 1, 0)
            }

            fn adapter_type(&self) -> AdapterType {
                $kind
            }

            async fn health_check(&self) -> Result<HealthStatus, LessonflowError> {
                Ok(HealthStatus::Healthy)
            }

            async fn shutdown(&self) -> Result<(), LessonflowError> {
                Ok(())
            }
        }
    };
}

/// In-memory user directory. Unknown users exist and are not banned.
#[derive(Default)]
pub struct MockIdentity {
    banned: Arc<Mutex<HashMap<String, bool>>>,
    bans: Arc<Mutex<Vec<String>>>,
    unbans: Arc<Mutex<Vec<String>>>,
    failing_bans: Arc<Mutex<u32>>,
}

impl MockIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a user's ban flag without recording a ban call.
    pub async fn set_banned(&self, user_id: &str, banned: bool) {
        self.banned.lock().await.insert(user_id.to_string(), banned);
    }

    pub async fn is_banned(&self, user_id: &str) -> bool {
        self.banned
            .lock()
            .await
            .get(user_id)
            .copied()
            .unwrap_or(false)
    }

    /// Users passed to `ban_user`, in call order.
    pub async fn ban_calls(&self) -> Vec<String> {
        self.bans.lock().await.clone()
    }

    /// Users passed to `unban_user`, in call order.
    pub async fn unban_calls(&self) -> Vec<String> {
        self.unbans.lock().await.clone()
    }

    /// Make the next `n` ban calls fail with a provider error. Failed calls
    /// are not recorded.
    pub async fn fail_bans(&self, n: u32) {
        *self.failing_bans.lock().await = n;
    }
}

mock_adapter!(MockIdentity, "mock-identity", AdapterType::Identity);

#[async_trait]
impl IdentityAdapter for MockIdentity {
    async fn get_user(&self, user_id: &str) -> Result<IdentityUser, LessonflowError> {
        Ok(IdentityUser {
            id: user_id.to_string(),
            banned: self.is_banned(user_id).await,
        })
    }

    async fn ban_user(&self, user_id: &str) -> Result<(), LessonflowError> {
        {
            let mut failing = self.failing_bans.lock().await;
            if *failing > 0 {
                *failing -= 1;
                return Err(LessonflowError::Provider {
                    message: "identity provider returned 503".into(),
                    source: None,
                });
            }
        }
        self.bans.lock().await.push(user_id.to_string());
        self.set_banned(user_id, true).await;
        Ok(())
    }

    async fn unban_user(&self, user_id: &str) -> Result<(), LessonflowError> {
        self.unbans.lock().await.push(user_id.to_string());
        self.set_banned(user_id, false).await;
        Ok(())
    }
}

/// Records analytics calls and answers feature flags from a fixed set.
#[derive(Default)]
pub struct MockAnalytics {
    events: Arc<Mutex<Vec<AnalyticsEvent>>>,
    identifies: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
    flags: Arc<Mutex<HashSet<(String, String)>>>,
    flushes: Arc<Mutex<usize>>,
}

impl MockAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn `flag` on for `distinct_id`.
    pub async fn enable_flag(&self, flag: &str, distinct_id: &str) {
        self.flags
            .lock()
            .await
            .insert((flag.to_string(), distinct_id.to_string()));
    }

    pub async fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.lock().await.clone()
    }

    /// Names of captured events, in order.
    pub async fn event_names(&self) -> Vec<String> {
        self.events
            .lock()
            .await
            .iter()
            .map(|e| e.event.clone())
            .collect()
    }

    pub async fn identifies(&self) -> Vec<(String, serde_json::Value)> {
        self.identifies.lock().await.clone()
    }

    pub async fn flush_count(&self) -> usize {
        *self.flushes.lock().await
    }
}

mock_adapter!(MockAnalytics, "mock-analytics", AdapterType::Analytics);

#[async_trait]
impl AnalyticsAdapter for MockAnalytics {
    async fn capture(&self, event: AnalyticsEvent) -> Result<(), LessonflowError> {
        self.events.lock().await.push(event);
        Ok(())
    }

    async fn identify(
        &self,
        distinct_id: &str,
        properties: serde_json::Value,
    ) -> Result<(), LessonflowError> {
        self.identifies
            .lock()
            .await
            .push((distinct_id.to_string(), properties));
        Ok(())
    }

    async fn is_feature_enabled(
        &self,
        flag: &str,
        distinct_id: &str,
    ) -> Result<bool, LessonflowError> {
        Ok(self
            .flags
            .lock()
            .await
            .contains(&(flag.to_string(), distinct_id.to_string())))
    }

    async fn flush(&self) -> Result<(), LessonflowError> {
        *self.flushes.lock().await += 1;
        Ok(())
    }
}

/// Captures notifications instead of posting them.
#[derive(Default)]
pub struct MockNotifier {
    sent: Arc<Mutex<Vec<String>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Texts of every notification sent so far.
    pub async fn sent(&self) -> Vec<String> {
        self.sent.lock().await.clone()
    }
}

mock_adapter!(MockNotifier, "mock-notifier", AdapterType::Notifier);

#[async_trait]
impl NotifierAdapter for MockNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), LessonflowError> {
        self.sent.lock().await.push(notification.text);
        Ok(())
    }
}
