// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lesson summaries: generation from the transcript, paging over unsummarised
//! lessons, and summary embedding.

use async_trait::async_trait;
use lessonflow_bus::{Event, EventName, LessonRef, LessonSummaryRef, SummariseAll};
use lessonflow_core::types::CompletionRequest;
use lessonflow_core::{LessonSummaryStatus, LessonflowError, StatusMachine};
use lessonflow_storage::SummaryContent;
use lessonflow_storage::queries::{lessons, summaries, transcripts};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use super::{embed_into, mark_failed, skipped};
use crate::context::PipelineContext;
use crate::function::PipelineFunction;
use crate::scan::{id_payload, send_for_ids};
use crate::step::StepContext;
use crate::text::format_template;

const SUMMARY_PROMPT: &str = r#"You summarise educational lesson videos so that teachers can understand their content.
Be accurate and do not add information the lesson does not cover. Do not mention the teacher's name.
Do not start the summary with "In this lesson" or "This lesson".

Title: {title}.
Transcript:

{transcript}

End of transcript.

Respond with a JSON object with the keys "summary" (string), "topics", "learningObjectives", "concepts" and "keywords" (arrays of strings).
If you are unable to respond for any reason, respond with a JSON object with the key "errorMessage" explaining why.
Respond with the JSON object only."#;

/// What the model gave back for a summary request.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum SummaryReply {
    Summary { content: SummaryContent },
    Declined { reason: String },
}

fn parse_summary_reply(raw: &str) -> Result<SummaryReply, LessonflowError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| LessonflowError::NonRetriable {
        message: "summary response is not valid JSON".into(),
        source: Some(Box::new(e)),
    })?;
    if let Some(reason) = value.get("errorMessage") {
        return Ok(SummaryReply::Declined {
            reason: reason.as_str().unwrap_or_default().to_string(),
        });
    }
    let content = serde_json::from_value(value).map_err(|e| LessonflowError::NonRetriable {
        message: "summary response does not match the expected shape".into(),
        source: Some(Box::new(e)),
    })?;
    Ok(SummaryReply::Summary { content })
}

/// Text embedded for a summary: the summary and each list, pipe-separated.
pub fn summary_embedding_text(content: &SummaryContent) -> String {
    [
        content.summary.clone(),
        content.topics.join(", "),
        content.learning_objectives.join(", "),
        content.concepts.join(", "),
        content.keywords.join(", "),
    ]
    .join(" | ")
}

pub struct LessonSummarise;

#[async_trait]
impl PipelineFunction for LessonSummarise {
    fn id(&self) -> &'static str {
        "lesson-summarise"
    }

    fn trigger(&self) -> EventName {
        EventName::LessonSummarise
    }

    async fn run(
        &self,
        ctx: &PipelineContext,
        step: &StepContext,
        event: &Event,
    ) -> Result<Value, LessonflowError> {
        let LessonRef { lesson_id } = event.payload()?;
        let lesson = lessons::get_lesson(&ctx.db, &lesson_id)
            .await?
            .ok_or_else(|| LessonflowError::not_found("lesson", &lesson_id))?;
        if summaries::first_summary_for_lesson(&ctx.db, &lesson_id)
            .await?
            .is_some()
        {
            return Ok(skipped("lesson already summarised"));
        }
        let Some(transcript) = transcripts::transcript_text_for_lesson(&ctx.db, &lesson_id).await?
        else {
            info!(lesson_id, "lesson has no transcript, not summarising");
            return Ok(skipped("no transcript"));
        };

        let mut inputs = Map::new();
        inputs.insert("title".into(), Value::String(lesson.title.clone()));
        inputs.insert("transcript".into(), Value::String(transcript));
        let prompt = format_template(SUMMARY_PROMPT, &inputs)?;

        let completion = &ctx.completion;
        let reply: SummaryReply = step
            .run("generate", || async move {
                let mut request = CompletionRequest::json(prompt, "Summarise the lesson.");
                request.temperature = Some(0.0);
                let response = completion.complete(request).await?;
                if let Some(refusal) = response.refusal {
                    return Ok(SummaryReply::Declined { reason: refusal });
                }
                let content = response.content.ok_or_else(|| {
                    LessonflowError::non_retriable("summary response has no content")
                })?;
                parse_summary_reply(&content)
            })
            .await?;

        let content = match reply {
            SummaryReply::Summary { content } => content,
            SummaryReply::Declined { reason } => {
                warn!(lesson_id, reason, "model declined to summarise lesson");
                return Ok(json!({ "lessonId": lesson_id, "declined": reason }));
            }
        };

        let db = &ctx.db;
        let lesson_id_ref = &lesson_id;
        let content_ref = &content;
        let summary_id: String = step
            .run("store-summary", || async move {
                summaries::insert_summary(db, lesson_id_ref, content_ref).await
            })
            .await?;

        step.send_event(
            "send-summary-embed",
            EventName::LessonSummaryEmbed,
            id_payload("lessonSummaryId", &summary_id),
            None,
        )
        .await?;
        Ok(json!({ "lessonId": lesson_id, "lessonSummaryId": summary_id }))
    }
}

/// Page through lessons without a summary and request one for each, pausing
/// between pages to stay under the model's rate limit.
pub struct LessonSummariseAll;

#[async_trait]
impl PipelineFunction for LessonSummariseAll {
    fn id(&self) -> &'static str {
        "lesson-summarise-all"
    }

    fn trigger(&self) -> EventName {
        EventName::LessonSummariseAll
    }

    async fn run(
        &self,
        ctx: &PipelineContext,
        step: &StepContext,
        event: &Event,
    ) -> Result<Value, LessonflowError> {
        let SummariseAll { new_lessons_only } = event.payload()?;
        let new_only = new_lessons_only.unwrap_or(false);
        let page_size = ctx.settings.page_size.max(1);
        let mut after: Option<String> = None;
        let mut sent = 0;

        for page in 0.. {
            if page > 0 {
                step.sleep(&format!("pause-{page}"), ctx.settings.summarise_page_delay)
                    .await?;
            }
            let db = &ctx.db;
            let cursor = after.clone();
            let ids: Vec<String> = step
                .run(&format!("page-{page}"), || async move {
                    lessons::lesson_ids_without_summary(db, new_only, cursor.as_deref(), page_size)
                        .await
                })
                .await?;

            sent += send_for_ids(
                ctx,
                step,
                &format!("send-page-{page}"),
                &ids,
                EventName::LessonSummarise,
                "lessonId",
            )
            .await?;

            if ids.len() < page_size as usize {
                break;
            }
            after = ids.last().cloned();
        }

        info!(sent, new_only, "summarise requests sent");
        Ok(json!({ "sent": sent }))
    }
}

pub struct LessonSummaryEmbed;

#[async_trait]
impl PipelineFunction for LessonSummaryEmbed {
    fn id(&self) -> &'static str {
        "lesson-summary-embed"
    }

    fn trigger(&self) -> EventName {
        EventName::LessonSummaryEmbed
    }

    async fn run(
        &self,
        ctx: &PipelineContext,
        step: &StepContext,
        event: &Event,
    ) -> Result<Value, LessonflowError> {
        let LessonSummaryRef { lesson_summary_id } = event.payload()?;
        let summary = summaries::get_summary(&ctx.db, &lesson_summary_id)
            .await?
            .ok_or_else(|| LessonflowError::not_found("lessonSummary", &lesson_summary_id))?;
        if summary.status.is_terminal() {
            return Ok(skipped("already embedded"));
        }

        let text = summary_embedding_text(&summary.content);
        embed_into(ctx, step, &lesson_summary_id, &text, LessonSummaryStatus::Success).await?;
        Ok(json!({ "lessonSummaryId": lesson_summary_id, "status": LessonSummaryStatus::Success }))
    }

    async fn on_failure(
        &self,
        ctx: &PipelineContext,
        event: &Event,
        _error: &LessonflowError,
    ) -> Result<(), LessonflowError> {
        let LessonSummaryRef { lesson_summary_id } = event.payload()?;
        mark_failed(ctx, &lesson_summary_id, LessonSummaryStatus::Failed).await
    }
}
