// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity-provider adapter trait.

use async_trait::async_trait;

use crate::error::LessonflowError;
use crate::traits::adapter::PluginAdapter;
use crate::types::IdentityUser;

/// Adapter for the external user directory that owns the ban flag.
#[async_trait]
pub trait IdentityAdapter: PluginAdapter {
    /// Fetch a user's current state.
    async fn get_user(&self, user_id: &str) -> Result<IdentityUser, LessonflowError>;

    /// Ban a user. Banned users can no longer sign in.
    async fn ban_user(&self, user_id: &str) -> Result<(), LessonflowError>;

    /// Lift a ban.
    async fn unban_user(&self, user_id: &str) -> Result<(), LessonflowError>;
}
