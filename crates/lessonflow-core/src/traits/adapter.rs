// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait that every external client implements.

use async_trait::async_trait;

use crate::error::LessonflowError;
use crate::types::{AdapterType, HealthStatus};

/// Identity, lifecycle, and health check for an external client.
///
/// Clients are constructed once at startup and shared by `Arc`; nothing in
/// the workspace reaches for a global instance.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the semantic version of this adapter.
    fn version(&self) -> semver::Version;

    /// Returns the capability this adapter provides.
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, LessonflowError>;

    /// Flushes buffered work and releases held resources.
    async fn shutdown(&self) -> Result<(), LessonflowError>;
}
