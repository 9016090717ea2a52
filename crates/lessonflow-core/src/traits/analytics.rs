// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Product analytics and feature flag adapter trait.

use async_trait::async_trait;

use crate::error::LessonflowError;
use crate::traits::adapter::PluginAdapter;
use crate::types::AnalyticsEvent;

/// Adapter for event capture, person properties, and feature flags.
#[async_trait]
pub trait AnalyticsAdapter: PluginAdapter {
    /// Record an event.
    async fn capture(&self, event: AnalyticsEvent) -> Result<(), LessonflowError>;

    /// Set person properties for `distinct_id`.
    async fn identify(
        &self,
        distinct_id: &str,
        properties: serde_json::Value,
    ) -> Result<(), LessonflowError>;

    /// Whether `flag` is enabled for `distinct_id`.
    async fn is_feature_enabled(
        &self,
        flag: &str,
        distinct_id: &str,
    ) -> Result<bool, LessonflowError>;

    /// Deliver anything buffered.
    async fn flush(&self) -> Result<(), LessonflowError>;
}
