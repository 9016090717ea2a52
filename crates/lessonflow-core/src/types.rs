// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the capability an adapter provides.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Completion,
    Embedding,
    Moderation,
    Identity,
    Analytics,
    Notifier,
    Storage,
}

// --- Completion ---

/// Role of a chat message sent to a completion model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A request to a completion model.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    /// Ask the model for a JSON object response.
    pub json_mode: bool,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// A JSON-mode request with a system prompt and one user message.
    pub fn json(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            model: None,
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            json_mode: true,
            temperature: Some(0.7),
        }
    }
}

/// Token accounting returned by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// The model's answer to a [`CompletionRequest`].
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    pub content: Option<String>,
    /// Set when the model declined the request.
    pub refusal: Option<String>,
    pub model: String,
    pub usage: TokenUsage,
}

// --- Embedding ---

/// Texts to embed in one call.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    pub texts: Vec<String>,
}

/// Vectors in the same order as [`EmbeddingInput::texts`].
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub dimensions: usize,
}

// --- Moderation ---

/// Category scores for a moderated input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModerationResult {
    pub flagged: bool,
    /// Categories whose score crossed the configured threshold.
    pub categories: Vec<String>,
    pub scores: BTreeMap<String, f64>,
}

// --- Identity / analytics / notification ---

/// The subset of identity-provider user state Lessonflow reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityUser {
    pub id: String,
    pub banned: bool,
}

/// A product-analytics event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsEvent {
    pub distinct_id: String,
    pub event: String,
    pub properties: serde_json::Value,
}

impl AnalyticsEvent {
    pub fn new(
        distinct_id: impl Into<String>,
        event: impl Into<String>,
        properties: serde_json::Value,
    ) -> Self {
        Self {
            distinct_id: distinct_id.into(),
            event: event.into(),
            properties,
        }
    }
}

/// A plain-text message for the team chat channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub text: String,
}
