// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Question-and-answer snippets.
//!
//! Every quiz question without a snippet gets one built from the question
//! and its correct answer, which is then queued for embedding. Questions
//! with no correct answer are left alone.

use async_trait::async_trait;
use lessonflow_bus::{Event, EventName};
use lessonflow_core::LessonflowError;
use lessonflow_storage::queries::{quizzes, snippets};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::context::PipelineContext;
use crate::function::PipelineFunction;
use crate::scan::send_for_ids;
use crate::step::StepContext;

/// Snippet text for a question and its correct answer.
pub fn question_snippet_content(question: &str, answer: &str) -> String {
    format!("Question: {question} – Correct Answer: {answer}")
}

/// Create the snippet for one question. Returns its id when one was created.
async fn snippet_for_question(
    ctx: &PipelineContext,
    question_id: &str,
) -> Result<Option<String>, LessonflowError> {
    let Some(question) = quizzes::get_question(&ctx.db, question_id).await? else {
        debug!(question_id, "question disappeared");
        return Ok(None);
    };
    let Some(answer) = quizzes::correct_answer(&ctx.db, question_id).await? else {
        info!(question_id, "no correct answer, skipping question");
        return Ok(None);
    };
    snippets::insert_question_snippet(
        &ctx.db,
        &question.lesson_id,
        question_id,
        &question_snippet_content(&question.question, &answer),
    )
    .await
}

pub struct SnippetGenerateForAllQuestions;

#[async_trait]
impl PipelineFunction for SnippetGenerateForAllQuestions {
    fn id(&self) -> &'static str {
        "snippet-generate-for-all-questions"
    }

    fn trigger(&self) -> EventName {
        EventName::SnippetGenerateForAllQuestions
    }

    async fn run(
        &self,
        ctx: &PipelineContext,
        step: &StepContext,
        _event: &Event,
    ) -> Result<Value, LessonflowError> {
        let page_size = ctx.settings.page_size.max(1);
        let mut after: Option<String> = None;
        let mut created = 0;

        for page in 0.. {
            let db = &ctx.db;
            let cursor = after.clone();
            let question_ids: Vec<String> = step
                .run(&format!("page-{page}"), || async move {
                    snippets::question_ids_without_snippet(db, cursor.as_deref(), page_size).await
                })
                .await?;

            let ids = &question_ids;
            let snippet_ids: Vec<String> = step
                .run(&format!("create-page-{page}"), || async move {
                    let mut created = Vec::new();
                    for question_id in ids {
                        if let Some(id) = snippet_for_question(ctx, question_id).await? {
                            created.push(id);
                        }
                    }
                    Ok(created)
                })
                .await?;

            created += send_for_ids(
                ctx,
                step,
                &format!("send-page-{page}"),
                &snippet_ids,
                EventName::SnippetEmbed,
                "snippetId",
            )
            .await?;

            if question_ids.len() < page_size as usize {
                break;
            }
            after = question_ids.last().cloned();
        }

        info!(created, "question snippets created");
        Ok(json!({ "created": created }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_pairs_question_with_answer() {
        assert_eq!(
            question_snippet_content("What is 1/2 + 1/4?", "3/4"),
            "Question: What is 1/2 + 1/4? – Correct Answer: 3/4"
        );
    }
}
