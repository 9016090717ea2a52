// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use lessonflow_bus::{Event, EventName};
use lessonflow_core::{
    GenerationStatus, LessonPlanPartStatus, LessonPlanStatus, LessonSummaryStatus,
    LessonflowError, QuizAnswerStatus, QuizQuestionStatus, SnippetStatus, TranscriptStatus,
};
use lessonflow_storage::Database;
use lessonflow_storage::Tracked;
use lessonflow_storage::queries::{stats, status};
use serde_json::{Value, json};

use crate::context::PipelineContext;
use crate::function::PipelineFunction;
use crate::step::StepContext;

async fn counts_for<S: Tracked>(
    db: &Database,
    out: &mut Vec<(String, i64)>,
) -> Result<(), LessonflowError> {
    for (status, count) in status::count_by_status::<S>(db).await? {
        out.push((format!("{}.{status}", S::ENTITY), count));
    }
    Ok(())
}

/// Collect `<entity>.<STATUS>` row counts for every processable table.
pub async fn collect_statistics(db: &Database) -> Result<Vec<(String, i64)>, LessonflowError> {
    let mut out = Vec::new();
    counts_for::<TranscriptStatus>(db, &mut out).await?;
    counts_for::<SnippetStatus>(db, &mut out).await?;
    counts_for::<QuizQuestionStatus>(db, &mut out).await?;
    counts_for::<QuizAnswerStatus>(db, &mut out).await?;
    counts_for::<LessonSummaryStatus>(db, &mut out).await?;
    counts_for::<LessonPlanStatus>(db, &mut out).await?;
    counts_for::<LessonPlanPartStatus>(db, &mut out).await?;
    counts_for::<GenerationStatus>(db, &mut out).await?;
    Ok(out)
}

/// Recompute the `statistics` table.
pub struct StatsRecalculate;

#[async_trait]
impl PipelineFunction for StatsRecalculate {
    fn id(&self) -> &'static str {
        "stats-recalculate"
    }

    fn trigger(&self) -> EventName {
        EventName::StatsRecalculate
    }

    async fn run(
        &self,
        ctx: &PipelineContext,
        _step: &StepContext,
        _event: &Event,
    ) -> Result<Value, LessonflowError> {
        let values = collect_statistics(&ctx.db).await?;
        let rows = values.len();
        stats::replace_statistics(&ctx.db, values).await?;
        Ok(json!({ "statistics": rows }))
    }
}
