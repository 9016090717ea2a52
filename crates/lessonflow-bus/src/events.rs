// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event names and their payload shapes.
//!
//! [`EventName`] is the closed set of events the system accepts. Each name
//! maps to exactly one payload type through [`EventName::schema`]; the
//! catalog compiles those schemas once and every send is checked against
//! them.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Every event the bus accepts, by wire name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter,
    Serialize, Deserialize,
)]
pub enum EventName {
    #[strum(serialize = "app/healthcheck")]
    #[serde(rename = "app/healthcheck")]
    Healthcheck,

    #[strum(serialize = "app/transcript.embed")]
    #[serde(rename = "app/transcript.embed")]
    TranscriptEmbed,

    #[strum(serialize = "app/snippet.embed")]
    #[serde(rename = "app/snippet.embed")]
    SnippetEmbed,
    #[strum(serialize = "app/snippet.embedAll")]
    #[serde(rename = "app/snippet.embedAll")]
    SnippetEmbedAll,
    #[strum(serialize = "app/snippet.generateForAllQuestions")]
    #[serde(rename = "app/snippet.generateForAllQuestions")]
    SnippetGenerateForAllQuestions,

    #[strum(serialize = "app/quizQuestion.embed")]
    #[serde(rename = "app/quizQuestion.embed")]
    QuizQuestionEmbed,
    #[strum(serialize = "app/quizQuestion.embedAll")]
    #[serde(rename = "app/quizQuestion.embedAll")]
    QuizQuestionEmbedAll,
    /// Accepted from producers; no function subscribes.
    #[strum(serialize = "app/quizQuestion.generateAll")]
    #[serde(rename = "app/quizQuestion.generateAll")]
    QuizQuestionGenerateAll,

    #[strum(serialize = "app/quizAnswer.embed")]
    #[serde(rename = "app/quizAnswer.embed")]
    QuizAnswerEmbed,
    #[strum(serialize = "app/quizAnswer.embedAll")]
    #[serde(rename = "app/quizAnswer.embedAll")]
    QuizAnswerEmbedAll,
    /// Accepted from producers; no function subscribes.
    #[strum(serialize = "app/quizAnswer.generateAll")]
    #[serde(rename = "app/quizAnswer.generateAll")]
    QuizAnswerGenerateAll,

    #[strum(serialize = "app/lesson.summarise")]
    #[serde(rename = "app/lesson.summarise")]
    LessonSummarise,
    #[strum(serialize = "app/lesson.summariseAll")]
    #[serde(rename = "app/lesson.summariseAll")]
    LessonSummariseAll,
    #[strum(serialize = "app/lesson.generatePlan")]
    #[serde(rename = "app/lesson.generatePlan")]
    LessonGeneratePlan,
    #[strum(serialize = "app/lesson.quiz.embed")]
    #[serde(rename = "app/lesson.quiz.embed")]
    LessonQuizEmbed,

    #[strum(serialize = "app/subject.summarise")]
    #[serde(rename = "app/subject.summarise")]
    SubjectSummarise,
    #[strum(serialize = "app/subject.lessonPlans")]
    #[serde(rename = "app/subject.lessonPlans")]
    SubjectLessonPlans,
    #[strum(serialize = "app/subject.transcripts.embed")]
    #[serde(rename = "app/subject.transcripts.embed")]
    SubjectTranscriptsEmbed,
    #[strum(serialize = "app/subject.quizzes.embed")]
    #[serde(rename = "app/subject.quizzes.embed")]
    SubjectQuizzesEmbed,

    #[strum(serialize = "app/stats.recalculate")]
    #[serde(rename = "app/stats.recalculate")]
    StatsRecalculate,

    #[strum(serialize = "app/lessonSummary.embed")]
    #[serde(rename = "app/lessonSummary.embed")]
    LessonSummaryEmbed,
    #[strum(serialize = "app/lessonSummary.embedAll")]
    #[serde(rename = "app/lessonSummary.embedAll")]
    LessonSummaryEmbedAll,

    #[strum(serialize = "app/lessonPlan.embed")]
    #[serde(rename = "app/lessonPlan.embed")]
    LessonPlanEmbed,
    #[strum(serialize = "app/lessonPlan.embedAll")]
    #[serde(rename = "app/lessonPlan.embedAll")]
    LessonPlanEmbedAll,
    #[strum(serialize = "app/lessonPlan.generateAll")]
    #[serde(rename = "app/lessonPlan.generateAll")]
    LessonPlanGenerateAll,
    #[strum(serialize = "app/lessonPlan.process")]
    #[serde(rename = "app/lessonPlan.process")]
    LessonPlanProcess,
    #[strum(serialize = "app/lessonPlan.embedPart")]
    #[serde(rename = "app/lessonPlan.embedPart")]
    LessonPlanEmbedPart,
    #[strum(serialize = "app/lessonPlan.embedAllParts")]
    #[serde(rename = "app/lessonPlan.embedAllParts")]
    LessonPlanEmbedAllParts,

    #[strum(serialize = "app/generation.requested")]
    #[serde(rename = "app/generation.requested")]
    GenerationRequest,

    #[strum(serialize = "app/slack.notifyRateLimit")]
    #[serde(rename = "app/slack.notifyRateLimit")]
    SlackNotifyRateLimit,
    #[strum(serialize = "app/slack.notifyModeration")]
    #[serde(rename = "app/slack.notifyModeration")]
    SlackNotifyModeration,
    #[strum(serialize = "app/slack.notifyUserBan")]
    #[serde(rename = "app/slack.notifyUserBan")]
    SlackNotifyUserBan,

    /// Demo data seeding. Accepted from producers; no function subscribes.
    #[strum(serialize = "app/demo.populateStatuses")]
    #[serde(rename = "app/demo.populateStatuses")]
    DemoPopulateStatuses,
}

impl EventName {
    /// JSON schema of this event's payload.
    pub fn schema(self) -> serde_json::Value {
        use EventName::*;
        let schema = match self {
            Healthcheck | DemoPopulateStatuses => schemars::schema_for!(serde_json::Value),
            TranscriptEmbed => schemars::schema_for!(TranscriptRef),
            SnippetEmbed => schemars::schema_for!(SnippetRef),
            QuizQuestionEmbed => schemars::schema_for!(QuizQuestionRef),
            QuizAnswerEmbed => schemars::schema_for!(QuizAnswerRef),
            LessonSummarise | LessonGeneratePlan | LessonQuizEmbed => {
                schemars::schema_for!(LessonRef)
            }
            LessonSummariseAll => schemars::schema_for!(SummariseAll),
            SubjectSummarise | SubjectLessonPlans | SubjectTranscriptsEmbed
            | SubjectQuizzesEmbed => schemars::schema_for!(SubjectScope),
            LessonSummaryEmbed => schemars::schema_for!(LessonSummaryRef),
            LessonPlanEmbed | LessonPlanProcess => schemars::schema_for!(LessonPlanRef),
            LessonPlanEmbedPart => schemars::schema_for!(LessonPlanPartRef),
            GenerationRequest => schemars::schema_for!(GenerationRequestPayload),
            SlackNotifyRateLimit => schemars::schema_for!(RateLimitNotice),
            SlackNotifyModeration => schemars::schema_for!(ModerationNotice),
            SnippetEmbedAll | SnippetGenerateForAllQuestions | QuizQuestionEmbedAll
            | QuizQuestionGenerateAll | QuizAnswerEmbedAll | QuizAnswerGenerateAll
            | StatsRecalculate | LessonSummaryEmbedAll | LessonPlanEmbedAll | LessonPlanGenerateAll
            | LessonPlanEmbedAllParts | SlackNotifyUserBan => schemars::schema_for!(Empty),
        };
        serde_json::to_value(schema).unwrap_or(serde_json::Value::Bool(false))
    }

    /// Whether the event must carry the acting user.
    pub fn requires_user(self) -> bool {
        matches!(
            self,
            EventName::GenerationRequest
                | EventName::SlackNotifyRateLimit
                | EventName::SlackNotifyModeration
                | EventName::SlackNotifyUserBan
        )
    }
}

/// Payload of events that carry no data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Empty {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TranscriptRef {
    #[schemars(length(min = 1))]
    pub transcript_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SnippetRef {
    #[schemars(length(min = 1))]
    pub snippet_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QuizQuestionRef {
    #[schemars(length(min = 1))]
    pub quiz_question_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QuizAnswerRef {
    #[schemars(length(min = 1))]
    pub quiz_answer_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LessonRef {
    #[schemars(length(min = 1))]
    pub lesson_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SummariseAll {
    /// Restrict the scan to lessons flagged as new.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_lessons_only: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SubjectScope {
    #[schemars(length(min = 1))]
    pub subject_id: String,
    #[schemars(length(min = 1))]
    pub key_stage_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LessonSummaryRef {
    #[schemars(length(min = 1))]
    pub lesson_summary_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LessonPlanRef {
    #[schemars(length(min = 1))]
    pub lesson_plan_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LessonPlanPartRef {
    #[schemars(length(min = 1))]
    pub lesson_plan_part_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GenerationRequestPayload {
    #[schemars(length(min = 1))]
    pub app_id: String,
    #[schemars(length(min = 1))]
    pub prompt_id: String,
    #[schemars(length(min = 1))]
    pub generation_id: String,
    pub prompt_inputs: serde_json::Map<String, serde_json::Value>,
    /// Set by producers that stream the reply themselves. The worker
    /// always completes in one request and ignores it.
    #[serde(default)]
    pub stream_completion: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RateLimitNotice {
    pub limit: u32,
    /// Human-readable window, e.g. "24 h".
    pub window: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ModerationNotice {
    #[schemars(length(min = 1))]
    pub thread_id: String,
    pub categories: Vec<String>,
    pub justification: String,
}
