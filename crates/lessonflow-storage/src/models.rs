// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for storage entities.

use lessonflow_core::{
    GenerationStatus, LessonPlanPartStatus, LessonPlanStatus, LessonSummaryStatus,
    QuizAnswerStatus, QuizQuestionStatus, SnippetStatus, StatusMachine, TranscriptStatus,
};
use serde::{Deserialize, Serialize};

/// A queued event as stored in the `events` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub seq: i64,
    pub id: String,
    pub name: String,
    pub payload: String,
    pub user_id: Option<String>,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub created_at: String,
    pub locked_until: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub subject_id: String,
    pub key_stage_id: String,
    pub is_new_lesson: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub id: String,
    pub lesson_id: String,
    pub content: String,
    pub status: TranscriptStatus,
}

/// Where a snippet's content came from.
pub mod snippet_variant {
    pub const TRANSCRIPT: &str = "TRANSCRIPT";
    pub const QUESTION_AND_ANSWER: &str = "QUESTION_AND_ANSWER";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub id: String,
    pub lesson_id: String,
    pub transcript_id: Option<String>,
    /// Set on question-and-answer snippets.
    pub question_id: Option<String>,
    pub variant: String,
    pub idx: i64,
    pub content: String,
    pub status: SnippetStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    pub id: String,
    pub lesson_id: String,
    pub question: String,
    pub status: QuizQuestionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAnswer {
    pub id: String,
    pub question_id: String,
    pub answer: String,
    pub status: QuizAnswerStatus,
}

/// Structured summary fields produced by the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryContent {
    pub summary: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    #[serde(default)]
    pub concepts: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonSummary {
    pub id: String,
    pub lesson_id: String,
    pub content: SummaryContent,
    pub status: LessonSummaryStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LessonPlan {
    pub id: String,
    pub lesson_id: String,
    pub subject_id: String,
    pub key_stage_id: String,
    pub content: Option<serde_json::Value>,
    pub status: LessonPlanStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LessonPlanPart {
    pub id: String,
    pub lesson_plan_id: String,
    pub key: String,
    pub content: String,
    pub json: serde_json::Value,
    pub status: LessonPlanPartStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub id: String,
    pub app_id: String,
    pub slug: String,
    pub template: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub id: String,
    pub app_id: String,
    pub prompt_id: String,
    pub user_id: String,
    pub status: GenerationStatus,
    pub prompt_inputs: serde_json::Value,
    pub prompt_inputs_hash: Option<String>,
    pub response: Option<serde_json::Value>,
    pub error: Option<String>,
    pub moderation_type: Option<String>,
    /// Moderation results, kept whether or not the inputs were flagged.
    pub moderation_meta: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyViolationRecord {
    pub id: String,
    pub user_id: String,
    pub user_action: String,
    pub detection_source: String,
    pub record_type: String,
    pub record_id: String,
    pub created_at: String,
}

/// Convert an embedding to a little-endian f32 BLOB.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert a BLOB written by [`vec_to_blob`] back to a vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Read a status column, reporting unknown values as a conversion failure.
pub(crate) fn status_col<S: StatusMachine>(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<S> {
    let raw: String = row.get(idx)?;
    S::parse_stored(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Read a JSON text column.
pub(crate) fn json_col<T: serde::de::DeserializeOwned>(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Read a nullable JSON text column.
pub(crate) fn opt_json_col<T: serde::de::DeserializeOwned>(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|r| {
        serde_json::from_str(&r).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_layout_is_little_endian_f32() {
        let blob = vec_to_blob(&[1.0, -0.5]);
        assert_eq!(blob.len(), 8);
        assert_eq!(&blob[..4], &1.0_f32.to_le_bytes());
        assert_eq!(blob_to_vec(&blob), vec![1.0, -0.5]);
    }

    #[test]
    fn summary_content_reads_model_field_names() {
        let json = r#"{"summary":"s","topics":["t"],"learningObjectives":["lo"],"concepts":[],"keywords":["k"]}"#;
        let parsed: SummaryContent = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.learning_objectives, vec!["lo"]);
    }
}
