// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lesson plans: creation per lesson, content generation, part extraction,
//! and embedding of parts and whole plans.

use async_trait::async_trait;
use lessonflow_bus::{Event, EventName, LessonPlanPartRef, LessonPlanRef, LessonRef};
use lessonflow_core::types::CompletionRequest;
use lessonflow_core::{LessonPlanPartStatus, LessonPlanStatus, LessonflowError, StatusMachine};
use lessonflow_storage::queries::{lesson_plans, lessons, status, summaries, transcripts};
use lessonflow_storage::{LessonPlan, LessonPlanPart, LessonSummary};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use super::{embed_into, embed_into_named, mark_failed, skipped};
use crate::context::PipelineContext;
use crate::function::PipelineFunction;
use crate::scan::id_payload;
use crate::step::StepContext;
use crate::text::{is_empty_value, sentence_case, textify};

/// Top-level keys of generated content that describe the plan rather than
/// form a section of it.
const NON_PART_KEYS: [&str; 2] = ["subject", "keyStage"];

const PLAN_SYSTEM_PROMPT: &str = "You help teachers plan lessons. Produce a lesson plan as a single \
JSON object. Use the keys title, subject, keyStage, topic, learningOutcome, learningCycles, \
priorKnowledge, keyLearningPoints, misconceptions, keywords, starterQuiz, cycle1, cycle2, cycle3, \
exitQuiz and additionalMaterials. Base the plan on the lesson content you are given rather than \
on other material that could fit the title. Quizzes are multiple choice. Respond with the JSON \
object only.";

/// Text embedded for one plan section.
pub fn part_embedding_text(key: &str, content: &str) -> String {
    format!("{key}\n\n{content}")
}

/// Text embedded for a whole plan: every section under a readable heading.
pub fn plan_embedding_text(parts: &[LessonPlanPart]) -> String {
    parts
        .iter()
        .map(|p| format!("{}\n{}", sentence_case(&p.key), p.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn summary_overview(summary: Option<&LessonSummary>) -> String {
    let Some(summary) = summary else {
        return "There is no summary for this lesson.".to_string();
    };
    let c = &summary.content;
    format!(
        "LESSON SUMMARY\n{}\n\nTOPICS\n{}.\n\nLEARNING OBJECTIVES\n{}.\n\nCONCEPTS\n{}.\n\nKEYWORDS\n{}.",
        c.summary,
        c.topics.join(", "),
        c.learning_objectives.join(". "),
        c.concepts.join(", "),
        c.keywords.join(", "),
    )
}

pub struct LessonGeneratePlan;

#[async_trait]
impl PipelineFunction for LessonGeneratePlan {
    fn id(&self) -> &'static str {
        "lesson-generate-plan"
    }

    fn trigger(&self) -> EventName {
        EventName::LessonGeneratePlan
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

        let db = &ctx.db;
        let lesson = &lesson;
        let plan_id: Option<String> = step
            .run("create-plan", || async move {
                if lesson_plans::plan_for_lesson(db, &lesson.id).await?.is_some() {
                    return Ok(None);
                }
                lesson_plans::create_plan(db, &lesson.id, &lesson.subject_id, &lesson.key_stage_id)
                    .await
                    .map(Some)
            })
            .await?;
        let Some(plan_id) = plan_id else {
            return Ok(skipped("lesson already has a plan"));
        };

        step.send_event(
            "send-process",
            EventName::LessonPlanProcess,
            id_payload("lessonPlanId", &plan_id),
            None,
        )
        .await?;
        Ok(json!({ "lessonId": lesson_id, "lessonPlanId": plan_id }))
    }
}

/// What the model gave back for a plan request.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum PlanReply {
    Content { content: Value },
    Refused { reason: String },
}

/// Generate a plan's content, split it into parts, and embed them.
pub struct LessonPlanProcess;

impl LessonPlanProcess {
    async fn generate(
        ctx: &PipelineContext,
        plan: &LessonPlan,
    ) -> Result<PlanReply, LessonflowError> {
        let lesson = lessons::get_lesson(&ctx.db, &plan.lesson_id)
            .await?
            .ok_or_else(|| LessonflowError::not_found("lesson", &plan.lesson_id))?;
        let transcript = transcripts::transcript_text_for_lesson(&ctx.db, &lesson.id)
            .await?
            .unwrap_or_default();
        let summary = summaries::first_summary_for_lesson(&ctx.db, &lesson.id).await?;

        let user_prompt = format!(
            "Generate a lesson plan for the lesson titled \"{}\" in subject {} at key stage {}.\n\
             Base it on the transcript of the lesson being delivered and break it into learning \
             cycles that follow its structure.\n\n\
             LESSON TRANSCRIPT STARTS\n{}\nLESSON TRANSCRIPT ENDS\n\n{}",
            lesson.title,
            plan.subject_id,
            plan.key_stage_id,
            transcript,
            summary_overview(summary.as_ref()),
        );

        let response = ctx
            .completion
            .complete(CompletionRequest::json(PLAN_SYSTEM_PROMPT, user_prompt))
            .await?;
        if let Some(reason) = response.refusal {
            return Ok(PlanReply::Refused { reason });
        }
        let raw = response
            .content
            .ok_or_else(|| LessonflowError::non_retriable("lesson plan response has no content"))?;
        let content: Value = serde_json::from_str(&raw).map_err(|e| LessonflowError::NonRetriable {
            message: "lesson plan response is not valid JSON".into(),
            source: Some(Box::new(e)),
        })?;
        if !content.is_object() {
            return Err(LessonflowError::non_retriable(
                "lesson plan response is not a JSON object",
            ));
        }
        Ok(PlanReply::Content { content })
    }

    /// Generate content and store it. `None` when the model refused and the
    /// plan was failed.
    async fn generate_and_store(
        ctx: &PipelineContext,
        step: &StepContext,
        plan: &LessonPlan,
    ) -> Result<Option<Value>, LessonflowError> {
        let db = &ctx.db;
        let id = plan.id.as_str();
        let reply: PlanReply = step
            .run("generate", || async move { Self::generate(ctx, plan).await })
            .await?;
        let content = match reply {
            PlanReply::Content { content } => content,
            PlanReply::Refused { reason } => {
                warn!(lesson_plan_id = id, reason, "model refused to generate lesson plan");
                step.run("refused", || async move {
                    status::advance(db, id, LessonPlanStatus::Failed).await?;
                    Ok(())
                })
                .await?;
                return Ok(None);
            }
        };

        let content_ref = &content;
        step.run("store-content", || async move {
            lesson_plans::store_generated_content(db, id, content_ref).await
        })
        .await?;
        Ok(Some(content))
    }
}

#[async_trait]
impl PipelineFunction for LessonPlanProcess {
    fn id(&self) -> &'static str {
        "lesson-plan-process"
    }

    fn trigger(&self) -> EventName {
        EventName::LessonPlanProcess
    }

    async fn run(
        &self,
        ctx: &PipelineContext,
        step: &StepContext,
        event: &Event,
    ) -> Result<Value, LessonflowError> {
        let LessonPlanRef { lesson_plan_id } = event.payload()?;
        let plan = lesson_plans::get_plan(&ctx.db, &lesson_plan_id)
            .await?
            .ok_or_else(|| LessonflowError::not_found("lessonPlan", &lesson_plan_id))?;

        let db = &ctx.db;
        let id = lesson_plan_id.as_str();
        let content = match plan.status {
            LessonPlanStatus::Pending | LessonPlanStatus::Generating => {
                // A plan left GENERATING by a crashed run is picked up again.
                if plan.status == LessonPlanStatus::Pending {
                    step.run("start", || async move {
                        status::advance(db, id, LessonPlanStatus::Generating).await?;
                        Ok(())
                    })
                    .await?;
                }
                match Self::generate_and_store(ctx, step, &plan).await? {
                    Some(content) => content,
                    None => {
                        return Ok(json!({
                            "lessonPlanId": lesson_plan_id,
                            "status": LessonPlanStatus::Failed,
                        }));
                    }
                }
            }
            // Content is stored but parts or the embed request may be missing.
            LessonPlanStatus::Generated => plan.content.clone().ok_or_else(|| {
                LessonflowError::non_retriable(format!(
                    "lesson plan {lesson_plan_id} is generated but has no content"
                ))
            })?,
            other => {
                info!(lesson_plan_id, status = %other, "lesson plan not awaiting generation");
                return Ok(skipped("not pending"));
            }
        };

        let mut part_count = 0;
        if let Value::Object(sections) = &content {
            for (key, value) in sections {
                if NON_PART_KEYS.contains(&key.as_str()) || is_empty_value(value) {
                    continue;
                }
                let text = textify(value);
                let text_ref = &text;
                let (part_id, embedded): (String, bool) = step
                    .run(&format!("part-{key}"), || async move {
                        let part =
                            lesson_plans::get_or_create_part(db, id, key, text_ref, value).await?;
                        Ok((part.id, part.status == LessonPlanPartStatus::Success))
                    })
                    .await?;
                if !embedded {
                    embed_into_named(
                        ctx,
                        step,
                        &format!("part-{key}-"),
                        &part_id,
                        &part_embedding_text(key, &text),
                        LessonPlanPartStatus::Success,
                    )
                    .await?;
                }
                part_count += 1;
            }
        }

        step.send_event(
            "send-plan-embed",
            EventName::LessonPlanEmbed,
            id_payload("lessonPlanId", &lesson_plan_id),
            None,
        )
        .await?;
        Ok(json!({
            "lessonPlanId": lesson_plan_id,
            "status": LessonPlanStatus::Generated,
            "parts": part_count,
        }))
    }

    async fn on_failure(
        &self,
        ctx: &PipelineContext,
        event: &Event,
        _error: &LessonflowError,
    ) -> Result<(), LessonflowError> {
        let LessonPlanRef { lesson_plan_id } = event.payload()?;
        mark_failed(ctx, &lesson_plan_id, LessonPlanStatus::Failed).await
    }
}

pub struct LessonPlanEmbed;

#[async_trait]
impl PipelineFunction for LessonPlanEmbed {
    fn id(&self) -> &'static str {
        "lesson-plan-embed"
    }

    fn trigger(&self) -> EventName {
        EventName::LessonPlanEmbed
    }

    async fn run(
        &self,
        ctx: &PipelineContext,
        step: &StepContext,
        event: &Event,
    ) -> Result<Value, LessonflowError> {
        let LessonPlanRef { lesson_plan_id } = event.payload()?;
        let plan = lesson_plans::get_plan(&ctx.db, &lesson_plan_id)
            .await?
            .ok_or_else(|| LessonflowError::not_found("lessonPlan", &lesson_plan_id))?;
        if plan.status.is_terminal() {
            return Ok(skipped("already embedded"));
        }
        if plan.status != LessonPlanStatus::Generated {
            return Err(LessonflowError::non_retriable(format!(
                "lesson plan {lesson_plan_id} has not been generated"
            )));
        }

        let parts = lesson_plans::parts_for_plan(&ctx.db, &lesson_plan_id).await?;
        if parts.is_empty() {
            return Err(LessonflowError::non_retriable(format!(
                "lesson plan {lesson_plan_id} has no parts to embed"
            )));
        }

        let text = plan_embedding_text(&parts);
        embed_into(ctx, step, &lesson_plan_id, &text, LessonPlanStatus::Success).await?;
        Ok(json!({ "lessonPlanId": lesson_plan_id, "status": LessonPlanStatus::Success }))
    }

    async fn on_failure(
        &self,
        ctx: &PipelineContext,
        event: &Event,
        _error: &LessonflowError,
    ) -> Result<(), LessonflowError> {
        let LessonPlanRef { lesson_plan_id } = event.payload()?;
        mark_failed(ctx, &lesson_plan_id, LessonPlanStatus::Failed).await
    }
}

pub struct LessonPlanEmbedPart;

#[async_trait]
impl PipelineFunction for LessonPlanEmbedPart {
    fn id(&self) -> &'static str {
        "lesson-plan-embed-part"
    }

    fn trigger(&self) -> EventName {
        EventName::LessonPlanEmbedPart
    }

    async fn run(
        &self,
        ctx: &PipelineContext,
        step: &StepContext,
        event: &Event,
    ) -> Result<Value, LessonflowError> {
        let LessonPlanPartRef {
            lesson_plan_part_id,
        } = event.payload()?;
        let part = lesson_plans::get_part(&ctx.db, &lesson_plan_part_id)
            .await?
            .ok_or_else(|| LessonflowError::not_found("lessonPlanPart", &lesson_plan_part_id))?;
        if part.status.is_terminal() {
            return Ok(skipped("already embedded"));
        }

        let text = part_embedding_text(&part.key, &part.content);
        embed_into(
            ctx,
            step,
            &lesson_plan_part_id,
            &text,
            LessonPlanPartStatus::Success,
        )
        .await?;
        Ok(json!({
            "lessonPlanPartId": lesson_plan_part_id,
            "status": LessonPlanPartStatus::Success,
        }))
    }

    async fn on_failure(
        &self,
        ctx: &PipelineContext,
        event: &Event,
        _error: &LessonflowError,
    ) -> Result<(), LessonflowError> {
        let LessonPlanPartRef {
            lesson_plan_part_id,
        } = event.payload()?;
        mark_failed(ctx, &lesson_plan_part_id, LessonPlanPartStatus::Failed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(key: &str, content: &str) -> LessonPlanPart {
        LessonPlanPart {
            id: format!("p-{key}"),
            lesson_plan_id: "lp1".into(),
            key: key.into(),
            content: content.into(),
            json: Value::String(content.into()),
            status: LessonPlanPartStatus::Pending,
        }
    }

    #[test]
    fn plan_text_uses_sentence_case_headings() {
        let parts = vec![
            part("learningOutcome", "Explain eruptions"),
            part("keywords", "magma\nlava"),
        ];
        assert_eq!(
            plan_embedding_text(&parts),
            "Learning outcome\nExplain eruptions\n\nKeywords\nmagma\nlava"
        );
    }

    #[test]
    fn part_text_keeps_raw_key() {
        assert_eq!(part_embedding_text("priorKnowledge", "rocks"), "priorKnowledge\n\nrocks");
    }

    #[test]
    fn overview_without_summary() {
        assert_eq!(summary_overview(None), "There is no summary for this lesson.");
    }
}
