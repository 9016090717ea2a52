// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared clients handed to every pipeline function.

use std::sync::Arc;
use std::time::Duration;

use lessonflow_bus::EventBus;
use lessonflow_config::LessonflowConfig;
use lessonflow_core::{
    Clock, CompletionAdapter, EmbeddingAdapter, ModerationAdapter, NotifierAdapter,
};
use lessonflow_safety::SafetyViolations;
use lessonflow_storage::Database;

/// Tunables read from configuration at startup.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Ids fetched per scanner page.
    pub page_size: u32,
    /// Pause between `lesson.summariseAll` pages.
    pub summarise_page_delay: Duration,
    pub moderation_enabled: bool,
    /// Serve identical generation requests from an earlier response.
    pub prompt_playback: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&LessonflowConfig::default())
    }
}

impl From<&LessonflowConfig> for PipelineSettings {
    fn from(config: &LessonflowConfig) -> Self {
        Self {
            page_size: config.scanner.page_size,
            summarise_page_delay: Duration::from_millis(config.scanner.summarise_page_delay_ms),
            moderation_enabled: config.moderation.enabled,
            prompt_playback: config.generation.prompt_playback,
        }
    }
}

/// Everything a function may touch, constructed once at process start.
#[derive(Clone)]
pub struct PipelineContext {
    pub db: Database,
    pub bus: EventBus,
    pub completion: Arc<dyn CompletionAdapter>,
    pub embedder: Arc<dyn EmbeddingAdapter>,
    pub moderation: Arc<dyn ModerationAdapter>,
    pub notifier: Arc<dyn NotifierAdapter>,
    pub safety: SafetyViolations,
    pub clock: Arc<dyn Clock>,
    pub settings: PipelineSettings,
}
