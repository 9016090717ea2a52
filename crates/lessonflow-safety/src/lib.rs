// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Safety violation counter.
//!
//! Every moderation hit is stored as a violation row. When a user's count
//! inside the rolling window exceeds the allowed number they are banned at
//! the identity provider, unless they carry the safety-tester feature flag.
//! The identity provider is the source of truth for ban state; nothing about
//! the ban is stored locally. Lifting a ban does not reset the count.

pub mod kinds;

use std::sync::Arc;

use chrono::Duration;
use lessonflow_bus::{EventBus, EventName};
use lessonflow_config::model::SafetyConfig;
use lessonflow_core::clock::to_db_timestamp;
use lessonflow_core::types::AnalyticsEvent;
use lessonflow_core::{AnalyticsAdapter, Clock, IdentityAdapter, LessonflowError};
use lessonflow_storage::Database;
use lessonflow_storage::SafetyViolationRecord;
use lessonflow_storage::queries::safety;
use serde_json::json;
use tracing::{info, warn};

pub use kinds::{DetectionSource, RecordType, UserAction};

/// Threshold settings.
#[derive(Debug, Clone)]
pub struct SafetyPolicy {
    /// Violations tolerated inside the window. The next one bans.
    pub max_allowed_violations: u32,
    pub window: Duration,
    /// Feature flag marking accounts that are never banned.
    pub tester_flag: String,
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self::from(&SafetyConfig::default())
    }
}

impl From<&SafetyConfig> for SafetyPolicy {
    fn from(config: &SafetyConfig) -> Self {
        Self {
            max_allowed_violations: config.max_allowed_violations,
            window: Duration::days(i64::from(config.window_days)),
            tester_flag: config.tester_flag.clone(),
        }
    }
}

/// What recording a violation led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationOutcome {
    /// Stored; the user is still within the allowance.
    Recorded,
    /// Over the threshold but flagged as a safety tester.
    TesterExempt,
    /// Over the threshold and already banned at the identity provider.
    AlreadyBanned,
    /// This violation caused a ban.
    Banned,
}

/// Records violations and bans or unbans users against the identity provider.
#[derive(Clone)]
pub struct SafetyViolations {
    db: Database,
    identity: Arc<dyn IdentityAdapter>,
    analytics: Arc<dyn AnalyticsAdapter>,
    bus: EventBus,
    clock: Arc<dyn Clock>,
    policy: SafetyPolicy,
}

impl SafetyViolations {
    pub fn new(
        db: Database,
        identity: Arc<dyn IdentityAdapter>,
        analytics: Arc<dyn AnalyticsAdapter>,
        bus: EventBus,
        clock: Arc<dyn Clock>,
        policy: SafetyPolicy,
    ) -> Self {
        Self {
            db,
            identity,
            analytics,
            bus,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &SafetyPolicy {
        &self.policy
    }

    /// Store a violation and ban the user if it takes them over the threshold.
    pub async fn record_violation(
        &self,
        user_id: &str,
        action: UserAction,
        source: DetectionSource,
        record_type: RecordType,
        record_id: &str,
    ) -> Result<ViolationOutcome, LessonflowError> {
        self.store_violation(user_id, action, source, record_type, record_id)
            .await?;
        self.enforce(user_id).await
    }

    /// Store a violation and report it, without checking the threshold.
    ///
    /// A user has at most one violation per record, so storing the same
    /// record twice returns the existing row's id.
    pub async fn store_violation(
        &self,
        user_id: &str,
        action: UserAction,
        source: DetectionSource,
        record_type: RecordType,
        record_id: &str,
    ) -> Result<String, LessonflowError> {
        info!(user_id, %action, %source, %record_type, record_id, "recording safety violation");
        let record = SafetyViolationRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            user_action: action.to_string(),
            detection_source: source.to_string(),
            record_type: record_type.to_string(),
            record_id: record_id.to_string(),
            created_at: to_db_timestamp(self.clock.now()),
        };
        let id = safety::insert_violation(&self.db, &record).await?;
        if id != record.id {
            info!(user_id, record_id, violation_id = %id, "violation already recorded");
            return Ok(id);
        }
        metrics::counter!("lessonflow_safety_violations_total", "source" => source.to_string())
            .increment(1);

        self.analytics
            .capture(AnalyticsEvent::new(
                user_id,
                "Safety Violation",
                json!({
                    "userAction": action.as_ref(),
                    "detectionSource": source.as_ref(),
                    "recordType": record_type.as_ref(),
                    "recordId": record_id,
                }),
            ))
            .await?;
        Ok(id)
    }

    /// Ban the user if their in-window count is over the threshold.
    ///
    /// Safe to call repeatedly: a user already banned at the identity
    /// provider is left alone.
    pub async fn enforce(&self, user_id: &str) -> Result<ViolationOutcome, LessonflowError> {
        if !self.is_over_threshold(user_id).await? {
            return Ok(ViolationOutcome::Recorded);
        }

        if self
            .analytics
            .is_feature_enabled(&self.policy.tester_flag, user_id)
            .await?
        {
            info!(user_id, "not banning user: safety tester");
            return Ok(ViolationOutcome::TesterExempt);
        }

        if self.identity.get_user(user_id).await?.banned {
            info!(user_id, "user already banned");
            return Ok(ViolationOutcome::AlreadyBanned);
        }

        self.ban_user(user_id).await?;
        Ok(ViolationOutcome::Banned)
    }

    /// Whether the user's in-window count exceeds the allowance.
    pub async fn is_over_threshold(&self, user_id: &str) -> Result<bool, LessonflowError> {
        let since = to_db_timestamp(self.clock.now() - self.policy.window);
        let count = safety::count_since(&self.db, user_id, &since).await?;
        Ok(count > i64::from(self.policy.max_allowed_violations))
    }

    /// Ban at the identity provider, then report it.
    ///
    /// Analytics or notification failures after the ban surface as errors
    /// but do not undo the ban.
    pub async fn ban_user(&self, user_id: &str) -> Result<(), LessonflowError> {
        warn!(user_id, "banning user");
        self.identity.ban_user(user_id).await?;
        metrics::counter!("lessonflow_safety_bans_total").increment(1);

        self.analytics
            .capture(AnalyticsEvent::new(user_id, "User Banned", json!({})))
            .await?;
        self.analytics
            .identify(user_id, json!({ "banned": true }))
            .await?;
        self.analytics.flush().await?;
        self.bus
            .send(EventName::SlackNotifyUserBan, json!({}), Some(user_id))
            .await?;
        Ok(())
    }

    /// Delete one violation and unban its user if they drop under the threshold.
    pub async fn remove_violation_by_id(&self, id: &str) -> Result<(), LessonflowError> {
        match safety::delete_by_id(&self.db, id).await? {
            Some(user_id) => self.conditionally_unban_user(&user_id).await,
            None => {
                info!(id, "no safety violation with this id");
                Ok(())
            }
        }
    }

    /// Delete every violation tied to `record_id`, then re-check each user.
    pub async fn remove_violations_by_record_id(
        &self,
        record_id: &str,
    ) -> Result<(), LessonflowError> {
        let mut users = safety::delete_by_record_id(&self.db, record_id).await?;
        users.sort();
        users.dedup();
        for user_id in users {
            self.conditionally_unban_user(&user_id).await?;
        }
        Ok(())
    }

    /// Unban the user if they are banned and no longer over the threshold.
    pub async fn conditionally_unban_user(&self, user_id: &str) -> Result<(), LessonflowError> {
        if self.is_over_threshold(user_id).await? {
            return Ok(());
        }
        if !self.identity.get_user(user_id).await?.banned {
            return Ok(());
        }

        info!(user_id, "unbanning user");
        self.identity.unban_user(user_id).await?;
        self.analytics
            .capture(AnalyticsEvent::new(user_id, "User Unbanned", json!({})))
            .await?;
        self.analytics
            .identify(user_id, json!({ "banned": false }))
            .await?;
        self.analytics.flush().await
    }
}
