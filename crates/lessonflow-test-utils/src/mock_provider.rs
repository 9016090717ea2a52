// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock model adapters for deterministic testing.
//!
//! `MockCompletion` returns queued replies in FIFO order, falling back to an
//! empty JSON object when the queue runs dry. `MockEmbedder` derives vectors
//! from the text itself so equal texts always embed equally.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use lessonflow_core::types::{
    AdapterType, CompletionRequest, CompletionResponse, EmbeddingInput, EmbeddingOutput,
    HealthStatus, ModerationResult, TokenUsage,
};
use lessonflow_core::{
    CompletionAdapter, EmbeddingAdapter, LessonflowError, ModerationAdapter, PluginAdapter,
};
use tokio::sync::Mutex;

/// Vector width produced by [`MockEmbedder`].
pub const MOCK_DIMENSIONS: usize = 3;

/// One scripted completion outcome.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Raw message content, usually a JSON document.
    Content(String),
    /// The model declines with this reason.
    Refusal(String),
    /// The call fails with a retriable provider error.
    Error(String),
}

impl MockReply {
    pub fn json(value: serde_json::Value) -> Self {
        Self::Content(value.to_string())
    }
}

/// A mock completion model.
pub struct MockCompletion {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockCompletion {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock with replies served in order.
    pub fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue another reply.
    pub async fn add_reply(&self, reply: MockReply) {
        self.replies.lock().await.push_back(reply);
    }

    /// Every request received so far.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

impl Default for MockCompletion {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockCompletion {
    fn name(&self) -> &str {
        "mock-completion"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Completion
    }

    async fn health_check(&self) -> Result<HealthStatus, LessonflowError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LessonflowError> {
        Ok(())
    }
}

#[async_trait]
impl CompletionAdapter for MockCompletion {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, LessonflowError> {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| "mock-model".to_string());
        self.requests.lock().await.push(request);

        let reply = self
            .replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| MockReply::Content("{}".to_string()));

        let usage = TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
        };
        match reply {
            MockReply::Content(content) => Ok(CompletionResponse {
                content: Some(content),
                refusal: None,
                model,
                usage,
            }),
            MockReply::Refusal(reason) => Ok(CompletionResponse {
                content: None,
                refusal: Some(reason),
                model,
                usage,
            }),
            MockReply::Error(message) => Err(LessonflowError::Provider {
                message,
                source: None,
            }),
        }
    }
}

/// A mock embedding model.
///
/// Each vector is `[chars, words, 1.0]` for its text.
pub struct MockEmbedder {
    texts: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<usize>>,
    failures_left: Arc<Mutex<u32>>,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            texts: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(0)),
            failures_left: Arc::new(Mutex::new(0)),
        }
    }

    /// Fail the next `times` calls with a retriable provider error.
    pub async fn fail_times(&self, times: u32) {
        *self.failures_left.lock().await = times;
    }

    /// The vector this mock returns for `text`.
    pub fn vector_for(text: &str) -> Vec<f32> {
        vec![
            text.chars().count() as f32,
            text.split_whitespace().count() as f32,
            1.0,
        ]
    }

    /// Texts embedded successfully, in call order.
    pub async fn embedded_texts(&self) -> Vec<String> {
        self.texts.lock().await.clone()
    }

    /// Calls made, including failed ones.
    pub async fn call_count(&self) -> usize {
        *self.calls.lock().await
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, LessonflowError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LessonflowError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for MockEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, LessonflowError> {
        *self.calls.lock().await += 1;
        {
            let mut failures = self.failures_left.lock().await;
            if *failures > 0 {
                *failures -= 1;
                return Err(LessonflowError::Provider {
                    message: "mock embedding outage".to_string(),
                    source: None,
                });
            }
        }

        let embeddings = input.texts.iter().map(|t| Self::vector_for(t)).collect();
        self.texts.lock().await.extend(input.texts);
        Ok(EmbeddingOutput {
            embeddings,
            dimensions: MOCK_DIMENSIONS,
        })
    }
}

/// A mock moderation endpoint driven by trigger words.
///
/// Inputs containing a word registered with [`MockModeration::flag_on`] come
/// back flagged. Words registered with [`MockModeration::over_threshold_on`]
/// produce categories without the flagged bit.
pub struct MockModeration {
    flag_words: Arc<Mutex<Vec<String>>>,
    threshold_words: Arc<Mutex<Vec<String>>>,
    inputs: Arc<Mutex<Vec<String>>>,
}

impl MockModeration {
    pub fn new() -> Self {
        Self {
            flag_words: Arc::new(Mutex::new(Vec::new())),
            threshold_words: Arc::new(Mutex::new(Vec::new())),
            inputs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn flag_on(&self, word: &str) {
        self.flag_words.lock().await.push(word.to_string());
    }

    pub async fn over_threshold_on(&self, word: &str) {
        self.threshold_words.lock().await.push(word.to_string());
    }

    /// Every input moderated so far.
    pub async fn inputs(&self) -> Vec<String> {
        self.inputs.lock().await.clone()
    }
}

impl Default for MockModeration {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockModeration {
    fn name(&self) -> &str {
        "mock-moderation"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Moderation
    }

    async fn health_check(&self) -> Result<HealthStatus, LessonflowError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LessonflowError> {
        Ok(())
    }
}

#[async_trait]
impl ModerationAdapter for MockModeration {
    async fn moderate(&self, input: &str) -> Result<ModerationResult, LessonflowError> {
        self.inputs.lock().await.push(input.to_string());

        let flagged = self
            .flag_words
            .lock()
            .await
            .iter()
            .any(|w| input.contains(w.as_str()));
        if flagged {
            return Ok(ModerationResult {
                flagged: true,
                categories: vec!["harassment".to_string()],
                scores: BTreeMap::from([("harassment".to_string(), 0.97)]),
            });
        }

        let over = self
            .threshold_words
            .lock()
            .await
            .iter()
            .any(|w| input.contains(w.as_str()));
        if over {
            return Ok(ModerationResult {
                flagged: false,
                categories: vec!["violence".to_string()],
                scores: BTreeMap::from([("violence".to_string(), 0.6)]),
            });
        }
        Ok(ModerationResult::default())
    }
}
