// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-requested generations.
//!
//! A generation is created REQUESTED by the application, then moved through
//! PENDING, optional MODERATING, and GENERATING to SUCCESS. Moderation hits
//! and model refusals end in FLAGGED; an OpenAI moderation flag also counts
//! as a safety violation against the requesting user.

use async_trait::async_trait;
use lessonflow_bus::{Event, EventName, GenerationRequestPayload};
use lessonflow_core::types::{CompletionRequest, ModerationResult};
use lessonflow_core::{GenerationStatus, LessonflowError, StatusMachine};
use lessonflow_safety::{DetectionSource, RecordType, UserAction};
use lessonflow_storage::queries::{generations, status};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::context::PipelineContext;
use crate::function::PipelineFunction;
use crate::step::StepContext;
use crate::text::format_template;

/// Quiz inputs that are not free text and would trip moderation.
const UNMODERATED_INPUT_KEYS: [&str; 9] = [
    "subject",
    "ageRange",
    "distractorToRegenerate",
    "numberOfCorrectAnswers",
    "numberOfDistractors",
    "knowledge",
    "transcript",
    "fact",
    "sessionId",
];

const FLAGGED_MESSAGE: &str =
    "Inputs were flagged by OpenAI moderation as against their terms of service";
const ALREADY_PROCESSED_MESSAGE: &str = "Generation has already been processed";
const OVER_THRESHOLD_MESSAGE: &str = "Inputs were flagged by our moderation filter as exceeding our threshold for one or more categories";

const GENERATION_SYSTEM_PROMPT: &str =
    "You are an assistant for teachers. Follow the instructions exactly and respond with a JSON object.";

/// Moderation types stored on flagged generations.
pub mod moderation_type {
    pub const OPENAI_FLAGGED: &str = "OPENAI_FLAGGED";
    pub const OPENAI_OVER_THRESHOLD: &str = "OPENAI_OVER_THRESHOLD";
    pub const LLM_REFUSAL: &str = "LLM_REFUSAL";
}

/// The free-text part of the inputs, as sent to moderation.
pub fn moderation_input(inputs: &Map<String, Value>) -> String {
    inputs
        .iter()
        .filter(|(key, value)| !UNMODERATED_INPUT_KEYS.contains(&key.as_str()) && is_truthy(value))
        .map(|(_, value)| value.to_string())
        .collect::<Vec<_>>()
        .join(". ")
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Output of the first step: the formatted prompt and its inputs hash.
#[derive(Debug, Serialize, Deserialize)]
struct Prepared {
    prompt: String,
    hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum CompletionOutcome {
    Response { response: Value },
    Refused { reason: String },
}

pub struct GenerationRequest;

impl GenerationRequest {
    async fn prepare(
        ctx: &PipelineContext,
        payload: &GenerationRequestPayload,
    ) -> Result<Prepared, LessonflowError> {
        let generation = generations::get_generation(&ctx.db, &payload.generation_id)
            .await?
            .ok_or_else(|| LessonflowError::not_found("generation", &payload.generation_id))?;
        if generation.status != GenerationStatus::Requested {
            return Err(LessonflowError::non_retriable(ALREADY_PROCESSED_MESSAGE));
        }

        let prompt = generations::get_prompt(&ctx.db, &payload.prompt_id)
            .await?
            .filter(|p| p.app_id == payload.app_id)
            .ok_or_else(|| LessonflowError::non_retriable("Prompt does not exist"))?;
        let body = format_template(&prompt.template, &payload.prompt_inputs)?;
        let hash = generations::prompt_inputs_hash(
            &payload.prompt_id,
            &Value::Object(payload.prompt_inputs.clone()),
        );
        generations::start_generation(&ctx.db, &payload.generation_id, &hash).await?;
        Ok(Prepared { prompt: body, hash })
    }

    /// Returns `true` when the generation was flagged and must stop here.
    async fn moderate(
        ctx: &PipelineContext,
        step: &StepContext,
        payload: &GenerationRequestPayload,
        user_id: &str,
    ) -> Result<bool, LessonflowError> {
        let id = payload.generation_id.as_str();
        let db = &ctx.db;
        step.run("moderating", || async move {
            status::advance(db, id, GenerationStatus::Moderating).await?;
            Ok(())
        })
        .await?;

        let input = moderation_input(&payload.prompt_inputs);
        if input.is_empty() {
            return Ok(false);
        }
        let moderation = &ctx.moderation;
        let result: ModerationResult = step
            .run("moderate", || async move { moderation.moderate(&input).await })
            .await?;
        let meta = json!({ "moderationResults": result });
        let meta = &meta;

        if result.flagged {
            info!(generation_id = id, categories = ?result.categories, "inputs flagged by moderation");
            step.run("flag", || async move {
                generations::flag_generation(
                    db,
                    id,
                    FLAGGED_MESSAGE,
                    moderation_type::OPENAI_FLAGGED,
                    Some(meta),
                )
                .await
            })
            .await?;
            let safety = &ctx.safety;
            let _violation_id: String = step
                .run("record-violation", || async move {
                    safety
                        .store_violation(
                            user_id,
                            UserAction::QuizGeneration,
                            DetectionSource::OpenAi,
                            RecordType::Generation,
                            id,
                        )
                        .await
                })
                .await?;
            step.run("enforce-threshold", || async move {
                let outcome = safety.enforce(user_id).await?;
                info!(user_id, ?outcome, "safety threshold checked");
                Ok(())
            })
            .await?;
            return Ok(true);
        }

        if !result.categories.is_empty() {
            info!(generation_id = id, categories = ?result.categories, "inputs over moderation threshold");
            step.run("flag", || async move {
                generations::flag_generation(
                    db,
                    id,
                    OVER_THRESHOLD_MESSAGE,
                    moderation_type::OPENAI_OVER_THRESHOLD,
                    Some(meta),
                )
                .await
            })
            .await?;
            return Ok(true);
        }

        step.run("save-moderation", || async move {
            generations::save_moderation_meta(db, id, meta).await
        })
        .await?;
        Ok(false)
    }

    async fn complete(
        ctx: &PipelineContext,
        payload: &GenerationRequestPayload,
        prepared: &Prepared,
    ) -> Result<CompletionOutcome, LessonflowError> {
        if ctx.settings.prompt_playback {
            if let Some(response) = generations::find_reusable_response(
                &ctx.db,
                &payload.prompt_id,
                &prepared.hash,
                &payload.generation_id,
            )
            .await?
            {
                info!(generation_id = %payload.generation_id, "playing back prior generation response");
                return Ok(CompletionOutcome::Response { response });
            }
        }

        let response = ctx
            .completion
            .complete(CompletionRequest::json(
                GENERATION_SYSTEM_PROMPT,
                prepared.prompt.clone(),
            ))
            .await?;
        if let Some(reason) = response.refusal {
            return Ok(CompletionOutcome::Refused { reason });
        }
        let raw = response
            .content
            .ok_or_else(|| LessonflowError::non_retriable("completion has no content"))?;
        let response: Value = serde_json::from_str(&raw).map_err(|e| LessonflowError::NonRetriable {
            message: "completion is not valid JSON".into(),
            source: Some(Box::new(e)),
        })?;
        Ok(CompletionOutcome::Response { response })
    }
}

#[async_trait]
impl PipelineFunction for GenerationRequest {
    fn id(&self) -> &'static str {
        "generation-request"
    }

    fn trigger(&self) -> EventName {
        EventName::GenerationRequest
    }

    async fn run(
        &self,
        ctx: &PipelineContext,
        step: &StepContext,
        event: &Event,
    ) -> Result<Value, LessonflowError> {
        let payload: GenerationRequestPayload = event.payload()?;
        let user_id = event
            .user_id()
            .ok_or_else(|| LessonflowError::non_retriable("generation request has no user"))?;
        let id = payload.generation_id.as_str();
        info!(
            generation_id = id,
            prompt_id = %payload.prompt_id,
            stream_completion = payload.stream_completion,
            "requesting generation"
        );

        let payload_ref = &payload;
        let prepared: Prepared = step
            .run("prepare", || async move { Self::prepare(ctx, payload_ref).await })
            .await?;

        if ctx.settings.moderation_enabled && Self::moderate(ctx, step, &payload, user_id).await? {
            return Ok(json!({ "generationId": id, "status": GenerationStatus::Flagged }));
        }

        let db = &ctx.db;
        step.run("generating", || async move {
            status::advance(db, id, GenerationStatus::Generating).await?;
            Ok(())
        })
        .await?;

        let prepared_ref = &prepared;
        let outcome: CompletionOutcome = step
            .run("complete", || async move {
                Self::complete(ctx, payload_ref, prepared_ref).await
            })
            .await?;

        match outcome {
            CompletionOutcome::Response { response } => {
                let response = &response;
                step.run("save", || async move {
                    generations::complete_generation(db, id, response).await
                })
                .await?;
                Ok(json!({ "generationId": id, "status": GenerationStatus::Success }))
            }
            CompletionOutcome::Refused { reason } => {
                warn!(generation_id = id, reason, "model refused generation");
                let reason = &reason;
                step.run("flag-refusal", || async move {
                    generations::flag_generation(
                        db,
                        id,
                        reason,
                        moderation_type::LLM_REFUSAL,
                        None,
                    )
                    .await
                })
                .await?;
                Ok(json!({ "generationId": id, "status": GenerationStatus::Flagged }))
            }
        }
    }

    async fn on_failure(
        &self,
        ctx: &PipelineContext,
        event: &Event,
        error: &LessonflowError,
    ) -> Result<(), LessonflowError> {
        // Another invocation owns a generation that was past REQUESTED.
        if matches!(error, LessonflowError::NonRetriable { message, .. } if message == ALREADY_PROCESSED_MESSAGE)
        {
            return Ok(());
        }
        let payload: GenerationRequestPayload = event.payload()?;
        let id = &payload.generation_id;
        match status::get_status::<GenerationStatus>(&ctx.db, id).await? {
            Some(current) if !current.is_terminal() => {
                generations::fail_generation(&ctx.db, id, &failure_message(error)).await
            }
            _ => Ok(()),
        }
    }
}

/// Message stored on a failed generation.
fn failure_message(error: &LessonflowError) -> String {
    match error {
        LessonflowError::NonRetriable { message, .. } | LessonflowError::Provider { message, .. } => {
            message.clone()
        }
        other => other.to_string(),
    }
}
