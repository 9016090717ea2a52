// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Team-chat notifier adapter trait.

use async_trait::async_trait;

use crate::error::LessonflowError;
use crate::traits::adapter::PluginAdapter;
use crate::types::Notification;

/// Adapter that posts operational notices to the team channel.
#[async_trait]
pub trait NotifierAdapter: PluginAdapter {
    async fn notify(&self, notification: Notification) -> Result<(), LessonflowError>;
}
