// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end pipeline testing.
//!
//! `TestHarness` assembles the full pipeline over a temp SQLite database:
//! a queue-backed bus, the safety counter, every registered function, and a
//! worker. Adapters are mocks that tests can script and inspect. `send()`
//! enqueues an event and `drain()` runs the worker until the queue is empty,
//! including everything the functions fan out.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use lessonflow_bus::{EventBus, EventName};
use lessonflow_core::{FixedClock, LessonflowError};
use lessonflow_pipeline::{
    PipelineContext, PipelineSettings, QueueTransport, Worker, WorkerOptions, functions,
};
use lessonflow_safety::{SafetyPolicy, SafetyViolations};
use lessonflow_storage::queries::{events, lessons};
use lessonflow_storage::{Database, EventRecord, Lesson};

use crate::mock_provider::{MockCompletion, MockEmbedder, MockModeration, MockReply};
use crate::mock_services::{MockAnalytics, MockIdentity, MockNotifier};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    replies: Vec<MockReply>,
    moderation_enabled: bool,
    prompt_playback: bool,
    policy: SafetyPolicy,
    max_attempts: u32,
    page_size: u32,
    start: DateTime<Utc>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            replies: Vec::new(),
            moderation_enabled: true,
            prompt_playback: false,
            policy: SafetyPolicy::default(),
            max_attempts: 3,
            page_size: 100,
            start: Utc
                .with_ymd_and_hms(2026, 1, 1, 9, 0, 0)
                .single()
                .unwrap_or_else(Utc::now),
        }
    }

    /// Set completion replies, served in order.
    pub fn with_completions(mut self, replies: Vec<MockReply>) -> Self {
        self.replies = replies;
        self
    }

    pub fn with_moderation(mut self, enabled: bool) -> Self {
        self.moderation_enabled = enabled;
        self
    }

    /// Reuse earlier successful responses for identical prompt inputs.
    pub fn with_prompt_playback(mut self, enabled: bool) -> Self {
        self.prompt_playback = enabled;
        self
    }

    pub fn with_policy(mut self, policy: SafetyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Deliveries per event before it is failed for good.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Ids per scanner page.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, LessonflowError> {
        let temp_dir = tempfile::TempDir::new()
            .map_err(|e| LessonflowError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");
        let db = Database::open(&db_path.to_string_lossy()).await?;

        let transport = Arc::new(QueueTransport::new(db.clone(), self.max_attempts));
        let bus = EventBus::new(transport, Some("test-event-key"))?;

        let completion = Arc::new(MockCompletion::with_replies(self.replies));
        let embedder = Arc::new(MockEmbedder::new());
        let moderation = Arc::new(MockModeration::new());
        let identity = Arc::new(MockIdentity::new());
        let analytics = Arc::new(MockAnalytics::new());
        let notifier = Arc::new(MockNotifier::new());
        let clock = Arc::new(FixedClock::new(self.start));

        let safety = SafetyViolations::new(
            db.clone(),
            identity.clone(),
            analytics.clone(),
            bus.clone(),
            clock.clone(),
            self.policy,
        );

        let ctx = PipelineContext {
            db: db.clone(),
            bus: bus.clone(),
            completion: completion.clone(),
            embedder: embedder.clone(),
            moderation: moderation.clone(),
            notifier: notifier.clone(),
            safety: safety.clone(),
            clock: clock.clone(),
            settings: PipelineSettings {
                page_size: self.page_size,
                summarise_page_delay: Duration::ZERO,
                moderation_enabled: self.moderation_enabled,
                prompt_playback: self.prompt_playback,
            },
        };

        let worker = Worker::new(
            ctx.clone(),
            functions::registry()?,
            WorkerOptions {
                concurrency: 1,
                poll_interval: Duration::from_millis(10),
                lock_timeout_secs: 300,
            },
        );

        Ok(TestHarness {
            db,
            bus,
            completion,
            embedder,
            moderation,
            identity,
            analytics,
            notifier,
            clock,
            safety,
            ctx,
            worker,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete pipeline over mocks and a throwaway database.
pub struct TestHarness {
    pub db: Database,
    pub bus: EventBus,
    pub completion: Arc<MockCompletion>,
    pub embedder: Arc<MockEmbedder>,
    pub moderation: Arc<MockModeration>,
    pub identity: Arc<MockIdentity>,
    pub analytics: Arc<MockAnalytics>,
    pub notifier: Arc<MockNotifier>,
    pub clock: Arc<FixedClock>,
    pub safety: SafetyViolations,
    pub ctx: PipelineContext,
    pub worker: Worker,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with default settings.
    pub async fn new() -> Result<Self, LessonflowError> {
        Self::builder().build().await
    }

    /// Validate and enqueue an event. Returns its id.
    pub async fn send(
        &self,
        name: EventName,
        data: serde_json::Value,
        user_id: Option<&str>,
    ) -> Result<String, LessonflowError> {
        self.bus.send(name, data, user_id).await
    }

    /// Run the worker until nothing is pending. Returns events settled.
    pub async fn drain(&self) -> Result<usize, LessonflowError> {
        let settled = self.worker.drain().await?;
        tracing::debug!(settled, "harness drained queue");
        Ok(settled)
    }

    /// Send one event and drain everything it causes.
    pub async fn run(
        &self,
        name: EventName,
        data: serde_json::Value,
        user_id: Option<&str>,
    ) -> Result<String, LessonflowError> {
        let id = self.send(name, data, user_id).await?;
        self.drain().await?;
        Ok(id)
    }

    /// Queue record for an event id.
    pub async fn event(&self, id: &str) -> Result<Option<EventRecord>, LessonflowError> {
        events::get_event(&self.db, id).await
    }

    /// Queue records for every event sent under `name`, oldest first.
    pub async fn events_named(&self, name: EventName) -> Result<Vec<EventRecord>, LessonflowError> {
        events::list_by_name(&self.db, name.as_ref()).await
    }

    /// Insert a lesson with a slug and title derived from `id`.
    pub async fn add_lesson(
        &self,
        id: &str,
        subject_id: &str,
        key_stage_id: &str,
    ) -> Result<Lesson, LessonflowError> {
        let lesson = Lesson {
            id: id.to_string(),
            slug: format!("{id}-slug"),
            title: format!("Lesson {id}"),
            subject_id: subject_id.to_string(),
            key_stage_id: key_stage_id.to_string(),
            is_new_lesson: true,
        };
        lessons::insert_lesson(&self.db, &lesson).await?;
        Ok(lesson)
    }
}
