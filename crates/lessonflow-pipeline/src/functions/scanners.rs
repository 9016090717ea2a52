// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Table-wide scanners. Each pages through one table's rows in a gate
//! status and sends the per-record event for every id.

use async_trait::async_trait;
use lessonflow_bus::{Event, EventName};
use lessonflow_core::{
    LessonPlanPartStatus, LessonPlanStatus, LessonSummaryStatus, LessonflowError,
    QuizAnswerStatus, QuizQuestionStatus, SnippetStatus,
};
use serde_json::{Value, json};

use crate::context::PipelineContext;
use crate::function::PipelineFunction;
use crate::scan::fan_out_status;
use crate::step::StepContext;

macro_rules! scanner {
    ($(#[$doc:meta])* $name:ident, $id:literal, $trigger:ident, $gate:expr, $target:ident, $field:literal) => {
        $(#[$doc])*
        pub struct $name;

        #[async_trait]
        impl PipelineFunction for $name {
            fn id(&self) -> &'static str {
                $id
            }

            fn trigger(&self) -> EventName {
                EventName::$trigger
            }

            async fn run(
                &self,
                ctx: &PipelineContext,
                step: &StepContext,
                _event: &Event,
            ) -> Result<Value, LessonflowError> {
                let sent = fan_out_status(ctx, step, $gate, EventName::$target, $field).await?;
                Ok(json!({ "sent": sent }))
            }
        }
    };
}

scanner!(
    SnippetEmbedAll,
    "snippet-embed-all",
    SnippetEmbedAll,
    SnippetStatus::Pending,
    SnippetEmbed,
    "snippetId"
);

scanner!(
    QuizQuestionEmbedAll,
    "quiz-question-embed-all",
    QuizQuestionEmbedAll,
    QuizQuestionStatus::Pending,
    QuizQuestionEmbed,
    "quizQuestionId"
);

scanner!(
    QuizAnswerEmbedAll,
    "quiz-answer-embed-all",
    QuizAnswerEmbedAll,
    QuizAnswerStatus::Pending,
    QuizAnswerEmbed,
    "quizAnswerId"
);

scanner!(
    /// Summaries are created GENERATED, so that is the status awaiting embedding.
    LessonSummaryEmbedAll,
    "lesson-summary-embed-all",
    LessonSummaryEmbedAll,
    LessonSummaryStatus::Generated,
    LessonSummaryEmbed,
    "lessonSummaryId"
);

scanner!(
    LessonPlanEmbedAll,
    "lesson-plan-embed-all",
    LessonPlanEmbedAll,
    LessonPlanStatus::Generated,
    LessonPlanEmbed,
    "lessonPlanId"
);

scanner!(
    LessonPlanGenerateAll,
    "lesson-plan-generate-all",
    LessonPlanGenerateAll,
    LessonPlanStatus::Pending,
    LessonPlanProcess,
    "lessonPlanId"
);

scanner!(
    LessonPlanEmbedAllParts,
    "lesson-plan-embed-all-parts",
    LessonPlanEmbedAllParts,
    LessonPlanPartStatus::Pending,
    LessonPlanEmbedPart,
    "lessonPlanPartId"
);
