// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion adapter trait for chat-style LLM calls.

use async_trait::async_trait;

use crate::error::LessonflowError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CompletionRequest, CompletionResponse};

/// Adapter for chat completion models.
#[async_trait]
pub trait CompletionAdapter: PluginAdapter {
    /// Sends a completion request and returns the full response.
    ///
    /// A model refusal is reported in [`CompletionResponse::refusal`], not as
    /// an error.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, LessonflowError>;
}
