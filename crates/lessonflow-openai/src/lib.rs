// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible adapter for Lessonflow.
//!
//! One [`OpenAiProvider`] serves chat completions, embeddings, and input
//! moderation, sharing a single HTTP client.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use lessonflow_config::LessonflowConfig;
use lessonflow_core::error::LessonflowError;
use lessonflow_core::traits::{
    CompletionAdapter, EmbeddingAdapter, ModerationAdapter, PluginAdapter,
};
use lessonflow_core::types::{
    AdapterType, CompletionRequest, CompletionResponse, EmbeddingInput, EmbeddingOutput,
    HealthStatus, ModerationResult, Role, TokenUsage,
};
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::types::{
    ChatRequest, ChatRequestMessage, ChatResponse, EmbeddingsRequest, EmbeddingsResponse,
    ModerationRequest, ModerationResponse, ResponseFormat,
};

/// Completion, embedding, and moderation against one OpenAI-compatible API.
///
/// API key resolution order: `openai.api_key` -> `OPENAI_API_KEY` -> error.
pub struct OpenAiProvider {
    client: OpenAiClient,
    completion_model: String,
    embedding_model: String,
    moderation_threshold: f64,
}

impl OpenAiProvider {
    pub fn new(config: &LessonflowConfig) -> Result<Self, LessonflowError> {
        let api_key = resolve_api_key(config.openai.api_key.as_deref())?;
        let client = OpenAiClient::new(
            &api_key,
            &config.openai.base_url,
            Duration::from_secs(config.openai.timeout_secs),
        )?;

        info!(
            completion_model = %config.openai.completion_model,
            embedding_model = %config.openai.embedding_model,
            "OpenAI provider initialized"
        );

        Ok(Self {
            client,
            completion_model: config.openai.completion_model.clone(),
            embedding_model: config.openai.embedding_model.clone(),
            moderation_threshold: config.moderation.threshold,
        })
    }

    /// Wrap an existing client.
    pub fn with_client(client: OpenAiClient, config: &LessonflowConfig) -> Self {
        Self {
            client,
            completion_model: config.openai.completion_model.clone(),
            embedding_model: config.openai.embedding_model.clone(),
            moderation_threshold: config.moderation.threshold,
        }
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    fn to_chat_request(&self, request: CompletionRequest) -> ChatRequest {
        ChatRequest {
            model: request
                .model
                .unwrap_or_else(|| self.completion_model.clone()),
            messages: request
                .messages
                .into_iter()
                .map(|m| ChatRequestMessage {
                    role: match m.role {
                        Role::System => "system",
                        Role::User => "user",
                        Role::Assistant => "assistant",
                    }
                    .to_string(),
                    content: m.content,
                })
                .collect(),
            temperature: request.temperature,
            response_format: request.json_mode.then(ResponseFormat::json_object),
        }
    }
}

fn resolve_api_key(configured: Option<&str>) -> Result<String, LessonflowError> {
    if let Some(key) = configured.filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }
    std::env::var("OPENAI_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            LessonflowError::Config(
                "no OpenAI API key: set openai.api_key or OPENAI_API_KEY".into(),
            )
        })
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
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
        debug!("OpenAI provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl CompletionAdapter for OpenAiProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, LessonflowError> {
        let body = self.to_chat_request(request);
        let response: ChatResponse = self.client.post_json("/chat/completions", &body).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LessonflowError::Provider {
                message: "completion response contained no choices".into(),
                source: None,
            })?;
        debug!(finish_reason = ?choice.finish_reason, "completion received");

        Ok(CompletionResponse {
            content: choice.message.content,
            refusal: choice.message.refusal,
            model: response.model,
            usage: response
                .usage
                .map(|u| TokenUsage {
                    prompt_tokens: u.prompt_tokens,
                    completion_tokens: u.completion_tokens,
                })
                .unwrap_or_default(),
        })
    }
}

#[async_trait]
impl EmbeddingAdapter for OpenAiProvider {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, LessonflowError> {
        let expected = input.texts.len();
        let body = EmbeddingsRequest {
            model: self.embedding_model.clone(),
            input: input.texts,
        };
        let mut response: EmbeddingsResponse = self.client.post_json("/embeddings", &body).await?;

        if response.data.len() != expected {
            return Err(LessonflowError::Provider {
                message: format!(
                    "expected {expected} embeddings, received {}",
                    response.data.len()
                ),
                source: None,
            });
        }
        response.data.sort_by_key(|d| d.index);
        let embeddings: Vec<Vec<f32>> = response.data.into_iter().map(|d| d.embedding).collect();
        let dimensions = embeddings.first().map(Vec::len).unwrap_or_default();
        Ok(EmbeddingOutput {
            embeddings,
            dimensions,
        })
    }
}

#[async_trait]
impl ModerationAdapter for OpenAiProvider {
    async fn moderate(&self, input: &str) -> Result<ModerationResult, LessonflowError> {
        let body = ModerationRequest {
            input: input.to_string(),
        };
        let response: ModerationResponse = self.client.post_json("/moderations", &body).await?;

        let mut result = ModerationResult::default();
        for entry in response.results {
            result.flagged |= entry.flagged;
            for (category, score) in entry.category_scores {
                if score > self.moderation_threshold && !result.categories.contains(&category) {
                    result.categories.push(category.clone());
                }
                let best = result.scores.entry(category).or_insert(score);
                *best = best.max(score);
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lessonflow_core::types::ChatMessage;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(uri: &str) -> OpenAiProvider {
        let mut config = LessonflowConfig::default();
        config.openai.api_key = Some("sk-test".into());
        config.openai.base_url = uri.to_string();
        OpenAiProvider::new(&config).unwrap()
    }

    #[tokio::test]
    async fn json_mode_request_sets_response_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "response_format": {"type": "json_object"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "gpt-4o-2024",
                "choices": [{"message": {"content": "{\"summary\":\"s\"}"}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 4}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = provider(&server.uri())
            .complete(CompletionRequest::json("system", "user"))
            .await
            .unwrap();
        assert_eq!(response.content.as_deref(), Some("{\"summary\":\"s\"}"));
        assert_eq!(response.usage.prompt_tokens, 12);
        assert!(response.refusal.is_none());
    }

    #[tokio::test]
    async fn refusal_is_reported_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "gpt-4o",
                "choices": [{"message": {"content": null, "refusal": "I can't help with that."}}]
            })))
            .mount(&server)
            .await;

        let request = CompletionRequest {
            model: None,
            messages: vec![ChatMessage::user("hi")],
            json_mode: false,
            temperature: None,
        };
        let response = provider(&server.uri()).complete(request).await.unwrap();
        assert!(response.content.is_none());
        assert_eq!(response.refusal.as_deref(), Some("I can't help with that."));
    }

    #[tokio::test]
    async fn embeddings_come_back_in_input_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(body_partial_json(json!({"model": "text-embedding-3-large"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"index": 1, "embedding": [0.0, 1.0]},
                    {"index": 0, "embedding": [1.0, 0.0]}
                ]
            })))
            .mount(&server)
            .await;

        let output = provider(&server.uri())
            .embed(EmbeddingInput {
                texts: vec!["first".into(), "second".into()],
            })
            .await
            .unwrap();
        assert_eq!(output.embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        assert_eq!(output.dimensions, 2);
    }

    #[tokio::test]
    async fn short_embedding_response_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        assert!(provider(&server.uri()).embed_one("text").await.is_err());
    }

    #[tokio::test]
    async fn moderation_applies_threshold_to_scores() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/moderations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{
                    "flagged": false,
                    "categories": {"violence": false, "hate": false},
                    "category_scores": {"violence": 0.35, "hate": 0.02}
                }]
            })))
            .mount(&server)
            .await;

        let result = provider(&server.uri()).moderate("some input").await.unwrap();
        assert!(!result.flagged);
        assert_eq!(result.categories, vec!["violence".to_string()]);
        assert_eq!(result.scores["hate"], 0.02);
    }

    #[test]
    fn configured_key_takes_precedence() {
        assert_eq!(resolve_api_key(Some("sk-configured")).unwrap(), "sk-configured");
    }
}
