// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use lessonflow_bus::{Event, EventName, TranscriptRef};
use lessonflow_core::{LessonflowError, StatusMachine, TranscriptStatus};
use lessonflow_storage::queries::{snippets, status, transcripts};
use serde_json::{Value, json};
use tracing::info;

use super::{mark_failed, skipped};
use crate::chunk::split_transcript;
use crate::context::PipelineContext;
use crate::function::PipelineFunction;
use crate::scan::send_for_ids;
use crate::step::StepContext;

/// Split a transcript into overlapping snippets and queue each for embedding.
pub struct TranscriptEmbed;

#[async_trait]
impl PipelineFunction for TranscriptEmbed {
    fn id(&self) -> &'static str {
        "transcript-embed"
    }

    fn trigger(&self) -> EventName {
        EventName::TranscriptEmbed
    }

    async fn run(
        &self,
        ctx: &PipelineContext,
        step: &StepContext,
        event: &Event,
    ) -> Result<Value, LessonflowError> {
        let TranscriptRef { transcript_id } = event.payload()?;
        let transcript = transcripts::get_transcript(&ctx.db, &transcript_id)
            .await?
            .ok_or_else(|| LessonflowError::not_found("transcript", &transcript_id))?;
        if transcript.status.is_terminal() {
            return Ok(skipped("already split"));
        }

        let db = &ctx.db;
        let transcript = &transcript;
        let snippet_ids: Vec<String> = step
            .run("create-snippets", || async move {
                let chunks = split_transcript(&transcript.content);
                snippets::insert_snippets(db, &transcript.lesson_id, Some(&transcript.id), &chunks)
                    .await
            })
            .await?;
        info!(transcript_id, snippets = snippet_ids.len(), "transcript split");

        step.run("complete", || async move {
            status::advance(db, &transcript.id, TranscriptStatus::Success).await?;
            Ok(())
        })
        .await?;

        let sent = send_for_ids(
            ctx,
            step,
            "send-snippet-embeds",
            &snippet_ids,
            EventName::SnippetEmbed,
            "snippetId",
        )
        .await?;
        Ok(json!({ "transcriptId": transcript_id, "snippets": sent }))
    }

    async fn on_failure(
        &self,
        ctx: &PipelineContext,
        event: &Event,
        _error: &LessonflowError,
    ) -> Result<(), LessonflowError> {
        let TranscriptRef { transcript_id } = event.payload()?;
        mark_failed(ctx, &transcript_id, TranscriptStatus::Failed).await
    }
}
