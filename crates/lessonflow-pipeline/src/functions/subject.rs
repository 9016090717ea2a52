// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subject and lesson scoped fan-outs.

use async_trait::async_trait;
use lessonflow_bus::{Event, EventName, LessonRef, SubjectScope};
use lessonflow_core::LessonflowError;
use lessonflow_storage::queries::{lessons, quizzes, summaries, transcripts};
use serde_json::{Value, json};
use tracing::info;

use crate::context::PipelineContext;
use crate::function::PipelineFunction;
use crate::scan::send_for_ids;
use crate::step::StepContext;

/// Request a plan for every lesson in the subject and key stage that lacks one.
pub struct SubjectLessonPlans;

#[async_trait]
impl PipelineFunction for SubjectLessonPlans {
    fn id(&self) -> &'static str {
        "subject-lesson-plans"
    }

    fn trigger(&self) -> EventName {
        EventName::SubjectLessonPlans
    }

    async fn run(
        &self,
        ctx: &PipelineContext,
        step: &StepContext,
        event: &Event,
    ) -> Result<Value, LessonflowError> {
        let SubjectScope {
            subject_id,
            key_stage_id,
        } = event.payload()?;
        let db = &ctx.db;
        let (subject, key_stage) = (&subject_id, &key_stage_id);
        let lesson_ids: Vec<String> = step
            .run("find-lessons", || async move {
                lessons::lesson_ids_without_plan(db, subject, key_stage).await
            })
            .await?;

        let sent = send_for_ids(
            ctx,
            step,
            "send-generate-plan",
            &lesson_ids,
            EventName::LessonGeneratePlan,
            "lessonId",
        )
        .await?;
        info!(subject_id, key_stage_id, sent, "lesson plans requested");
        Ok(json!({ "sent": sent }))
    }
}

/// Request a summary for every lesson in the subject and key stage without one.
pub struct SubjectSummarise;

#[async_trait]
impl PipelineFunction for SubjectSummarise {
    fn id(&self) -> &'static str {
        "subject-summarise"
    }

    fn trigger(&self) -> EventName {
        EventName::SubjectSummarise
    }

    async fn run(
        &self,
        ctx: &PipelineContext,
        step: &StepContext,
        event: &Event,
    ) -> Result<Value, LessonflowError> {
        let SubjectScope {
            subject_id,
            key_stage_id,
        } = event.payload()?;
        let db = &ctx.db;
        let (subject, key_stage) = (&subject_id, &key_stage_id);
        let lesson_ids: Vec<String> = step
            .run("find-lessons", || async move {
                let mut ids = Vec::new();
                for lesson in lessons::lessons_for_subject(db, subject, key_stage).await? {
                    if summaries::first_summary_for_lesson(db, &lesson.id)
                        .await?
                        .is_none()
                    {
                        ids.push(lesson.id);
                    }
                }
                Ok(ids)
            })
            .await?;

        let sent = send_for_ids(
            ctx,
            step,
            "send-summarise",
            &lesson_ids,
            EventName::LessonSummarise,
            "lessonId",
        )
        .await?;
        Ok(json!({ "sent": sent }))
    }
}

/// Split every pending transcript in the subject and key stage.
pub struct SubjectTranscriptsEmbed;

#[async_trait]
impl PipelineFunction for SubjectTranscriptsEmbed {
    fn id(&self) -> &'static str {
        "subject-transcripts-embed"
    }

    fn trigger(&self) -> EventName {
        EventName::SubjectTranscriptsEmbed
    }

    async fn run(
        &self,
        ctx: &PipelineContext,
        step: &StepContext,
        event: &Event,
    ) -> Result<Value, LessonflowError> {
        let SubjectScope {
            subject_id,
            key_stage_id,
        } = event.payload()?;
        let db = &ctx.db;
        let (subject, key_stage) = (&subject_id, &key_stage_id);
        let transcript_ids: Vec<String> = step
            .run("find-transcripts", || async move {
                transcripts::pending_transcript_ids_for_subject(db, subject, key_stage).await
            })
            .await?;

        let sent = send_for_ids(
            ctx,
            step,
            "send-transcript-embeds",
            &transcript_ids,
            EventName::TranscriptEmbed,
            "transcriptId",
        )
        .await?;
        Ok(json!({ "sent": sent }))
    }
}

/// Queue quiz embedding for every lesson in the subject and key stage.
pub struct SubjectQuizzesEmbed;

#[async_trait]
impl PipelineFunction for SubjectQuizzesEmbed {
    fn id(&self) -> &'static str {
        "subject-quizzes-embed"
    }

    fn trigger(&self) -> EventName {
        EventName::SubjectQuizzesEmbed
    }

    async fn run(
        &self,
        ctx: &PipelineContext,
        step: &StepContext,
        event: &Event,
    ) -> Result<Value, LessonflowError> {
        let SubjectScope {
            subject_id,
            key_stage_id,
        } = event.payload()?;
        let db = &ctx.db;
        let (subject, key_stage) = (&subject_id, &key_stage_id);
        let lesson_ids: Vec<String> = step
            .run("find-lessons", || async move {
                let lessons = lessons::lessons_for_subject(db, subject, key_stage).await?;
                Ok(lessons.into_iter().map(|l| l.id).collect())
            })
            .await?;

        let sent = send_for_ids(
            ctx,
            step,
            "send-quiz-embeds",
            &lesson_ids,
            EventName::LessonQuizEmbed,
            "lessonId",
        )
        .await?;
        Ok(json!({ "sent": sent }))
    }
}

/// Queue embedding for a lesson's pending quiz questions and answers.
pub struct LessonQuizEmbed;

#[async_trait]
impl PipelineFunction for LessonQuizEmbed {
    fn id(&self) -> &'static str {
        "lesson-quiz-embed"
    }

    fn trigger(&self) -> EventName {
        EventName::LessonQuizEmbed
    }

    async fn run(
        &self,
        ctx: &PipelineContext,
        step: &StepContext,
        event: &Event,
    ) -> Result<Value, LessonflowError> {
        let LessonRef { lesson_id } = event.payload()?;
        let db = &ctx.db;
        let lesson = &lesson_id;
        let (question_ids, answer_ids): (Vec<String>, Vec<String>) = step
            .run("find-quiz", || async move {
                quizzes::pending_quiz_ids_for_lesson(db, lesson).await
            })
            .await?;

        let questions = send_for_ids(
            ctx,
            step,
            "send-question-embeds",
            &question_ids,
            EventName::QuizQuestionEmbed,
            "quizQuestionId",
        )
        .await?;
        let answers = send_for_ids(
            ctx,
            step,
            "send-answer-embeds",
            &answer_ids,
            EventName::QuizAnswerEmbed,
            "quizAnswerId",
        )
        .await?;
        Ok(json!({ "questions": questions, "answers": answers }))
    }
}
