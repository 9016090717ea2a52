// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Moderation adapter trait.

use async_trait::async_trait;

use crate::error::LessonflowError;
use crate::traits::adapter::PluginAdapter;
use crate::types::ModerationResult;

/// Adapter that scores user-supplied text against safety categories.
#[async_trait]
pub trait ModerationAdapter: PluginAdapter {
    async fn moderate(&self, input: &str) -> Result<ModerationResult, LessonflowError>;
}
