// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-record embedding for snippets and quiz content.
//!
//! Each function skips records that already reached a terminal status, so a
//! duplicate event writes nothing and sends nothing.

use async_trait::async_trait;
use lessonflow_bus::{Event, EventName, QuizAnswerRef, QuizQuestionRef, SnippetRef};
use lessonflow_core::{
    LessonflowError, QuizAnswerStatus, QuizQuestionStatus, SnippetStatus, StatusMachine,
};
use lessonflow_storage::queries::{quizzes, snippets};
use serde_json::{Value, json};
use tracing::debug;

use super::{embed_into, mark_failed, skipped};
use crate::context::PipelineContext;
use crate::function::PipelineFunction;
use crate::step::StepContext;

pub struct SnippetEmbed;

#[async_trait]
impl PipelineFunction for SnippetEmbed {
    fn id(&self) -> &'static str {
        "snippet-embed"
    }

    fn trigger(&self) -> EventName {
        EventName::SnippetEmbed
    }

    async fn run(
        &self,
        ctx: &PipelineContext,
        step: &StepContext,
        event: &Event,
    ) -> Result<Value, LessonflowError> {
        let SnippetRef { snippet_id } = event.payload()?;
        let snippet = snippets::get_snippet(&ctx.db, &snippet_id)
            .await?
            .ok_or_else(|| LessonflowError::not_found("snippet", &snippet_id))?;
        if snippet.status.is_terminal() {
            debug!(snippet_id, status = %snippet.status, "snippet already settled");
            return Ok(skipped("already embedded"));
        }

        embed_into(ctx, step, &snippet_id, &snippet.content, SnippetStatus::Success).await?;
        Ok(json!({ "snippetId": snippet_id, "status": SnippetStatus::Success }))
    }

    async fn on_failure(
        &self,
        ctx: &PipelineContext,
        event: &Event,
        _error: &LessonflowError,
    ) -> Result<(), LessonflowError> {
        let SnippetRef { snippet_id } = event.payload()?;
        mark_failed(ctx, &snippet_id, SnippetStatus::Failed).await
    }
}

pub struct QuizQuestionEmbed;

#[async_trait]
impl PipelineFunction for QuizQuestionEmbed {
    fn id(&self) -> &'static str {
        "quiz-question-embed"
    }

    fn trigger(&self) -> EventName {
        EventName::QuizQuestionEmbed
    }

    async fn run(
        &self,
        ctx: &PipelineContext,
        step: &StepContext,
        event: &Event,
    ) -> Result<Value, LessonflowError> {
        let QuizQuestionRef { quiz_question_id } = event.payload()?;
        let question = quizzes::get_question(&ctx.db, &quiz_question_id)
            .await?
            .ok_or_else(|| LessonflowError::not_found("quizQuestion", &quiz_question_id))?;
        if question.status.is_terminal() {
            return Ok(skipped("already embedded"));
        }

        embed_into(
            ctx,
            step,
            &quiz_question_id,
            &question.question,
            QuizQuestionStatus::Success,
        )
        .await?;
        Ok(json!({ "quizQuestionId": quiz_question_id, "status": QuizQuestionStatus::Success }))
    }

    async fn on_failure(
        &self,
        ctx: &PipelineContext,
        event: &Event,
        _error: &LessonflowError,
    ) -> Result<(), LessonflowError> {
        let QuizQuestionRef { quiz_question_id } = event.payload()?;
        mark_failed(ctx, &quiz_question_id, QuizQuestionStatus::Failed).await
    }
}

pub struct QuizAnswerEmbed;

#[async_trait]
impl PipelineFunction for QuizAnswerEmbed {
    fn id(&self) -> &'static str {
        "quiz-answer-embed"
    }

    fn trigger(&self) -> EventName {
        EventName::QuizAnswerEmbed
    }

    async fn run(
        &self,
        ctx: &PipelineContext,
        step: &StepContext,
        event: &Event,
    ) -> Result<Value, LessonflowError> {
        let QuizAnswerRef { quiz_answer_id } = event.payload()?;
        let answer = quizzes::get_answer(&ctx.db, &quiz_answer_id)
            .await?
            .ok_or_else(|| LessonflowError::not_found("quizAnswer", &quiz_answer_id))?;
        if answer.status.is_terminal() {
            return Ok(skipped("already embedded"));
        }

        embed_into(
            ctx,
            step,
            &quiz_answer_id,
            &answer.answer,
            QuizAnswerStatus::Success,
        )
        .await?;
        Ok(json!({ "quizAnswerId": quiz_answer_id, "status": QuizAnswerStatus::Success }))
    }

    async fn on_failure(
        &self,
        ctx: &PipelineContext,
        event: &Event,
        _error: &LessonflowError,
    ) -> Result<(), LessonflowError> {
        let QuizAnswerRef { quiz_answer_id } = event.payload()?;
        mark_failed(ctx, &quiz_answer_id, QuizAnswerStatus::Failed).await
    }
}
