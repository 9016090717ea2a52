// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Every pipeline function, and the shared helpers they use.

pub mod embed;
pub mod generation;
pub mod healthcheck;
pub mod lesson_plans;
pub mod question_snippets;
pub mod scanners;
pub mod slack;
pub mod stats;
pub mod subject;
pub mod summaries;
pub mod transcript;

use std::sync::Arc;

use lessonflow_core::{LessonflowError, StatusMachine};
use lessonflow_storage::Tracked;
use lessonflow_storage::queries::status;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::context::PipelineContext;
use crate::function::{FunctionRegistry, PipelineFunction};
use crate::step::StepContext;

/// Every function this crate provides.
pub fn all() -> Vec<Arc<dyn PipelineFunction>> {
    vec![
        Arc::new(healthcheck::Healthcheck),
        Arc::new(embed::SnippetEmbed),
        Arc::new(embed::QuizQuestionEmbed),
        Arc::new(embed::QuizAnswerEmbed),
        Arc::new(transcript::TranscriptEmbed),
        Arc::new(summaries::LessonSummarise),
        Arc::new(summaries::LessonSummariseAll),
        Arc::new(summaries::LessonSummaryEmbed),
        Arc::new(lesson_plans::LessonGeneratePlan),
        Arc::new(lesson_plans::LessonPlanProcess),
        Arc::new(lesson_plans::LessonPlanEmbed),
        Arc::new(lesson_plans::LessonPlanEmbedPart),
        Arc::new(scanners::SnippetEmbedAll),
        Arc::new(question_snippets::SnippetGenerateForAllQuestions),
        Arc::new(scanners::QuizQuestionEmbedAll),
        Arc::new(scanners::QuizAnswerEmbedAll),
        Arc::new(scanners::LessonSummaryEmbedAll),
        Arc::new(scanners::LessonPlanEmbedAll),
        Arc::new(scanners::LessonPlanGenerateAll),
        Arc::new(scanners::LessonPlanEmbedAllParts),
        Arc::new(subject::SubjectLessonPlans),
        Arc::new(subject::SubjectSummarise),
        Arc::new(subject::SubjectTranscriptsEmbed),
        Arc::new(subject::SubjectQuizzesEmbed),
        Arc::new(subject::LessonQuizEmbed),
        Arc::new(stats::StatsRecalculate),
        Arc::new(generation::GenerationRequest),
        Arc::new(slack::NotifyUserBan),
        Arc::new(slack::NotifyRateLimit),
        Arc::new(slack::NotifyModeration),
    ]
}

/// A registry holding [`all`] functions.
pub fn registry() -> Result<FunctionRegistry, LessonflowError> {
    let mut registry = FunctionRegistry::new();
    for function in all() {
        registry.register(function)?;
    }
    Ok(registry)
}

/// Result returned when a function had nothing to do.
pub(crate) fn skipped(reason: &str) -> Value {
    json!({ "skipped": reason })
}

/// Embed `text` and store the vector, moving `id` to `success`.
///
/// Both halves are separate steps, so a retry after a failed write does not
/// pay for the embedding again.
pub(crate) async fn embed_into<S: Tracked>(
    ctx: &PipelineContext,
    step: &StepContext,
    id: &str,
    text: &str,
    success: S,
) -> Result<(), LessonflowError> {
    embed_into_named(ctx, step, "", id, text, success).await
}

/// [`embed_into`] with a step-name prefix, for embedding several records in
/// one invocation.
pub(crate) async fn embed_into_named<S: Tracked>(
    ctx: &PipelineContext,
    step: &StepContext,
    prefix: &str,
    id: &str,
    text: &str,
    success: S,
) -> Result<(), LessonflowError> {
    let embedder = &ctx.embedder;
    let vector: Vec<f32> = step
        .run(&format!("{prefix}embed"), || async move {
            embedder.embed_one(text).await
        })
        .await?;

    let db = &ctx.db;
    let vector = &vector;
    step.run(&format!("{prefix}store-embedding"), || async move {
        status::advance_with_embedding(db, id, success, vector).await?;
        Ok(())
    })
    .await
}

/// Move `id` to `failed` unless it already reached a terminal status.
pub(crate) async fn mark_failed<S: Tracked>(
    ctx: &PipelineContext,
    id: &str,
    failed: S,
) -> Result<(), LessonflowError> {
    match status::get_status::<S>(&ctx.db, id).await? {
        Some(current) if !current.is_terminal() => {
            status::advance(&ctx.db, id, failed).await?;
            info!(entity = S::ENTITY, id, from = %current, "marked failed");
        }
        Some(_) => {}
        None => warn!(entity = S::ENTITY, id, "cannot mark missing record failed"),
    }
    Ok(())
}
