// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared by every Lessonflow crate.

use thiserror::Error;

/// The primary error type used across adapters, storage, and pipeline functions.
///
/// The worker consults [`LessonflowError::is_retriable`] to decide whether a
/// failed invocation goes back on the queue or is failed permanently.
#[derive(Debug, Error)]
pub enum LessonflowError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// External provider errors (LLM, identity, analytics, webhook).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An event payload did not match the schema declared for its name.
    #[error("invalid payload for {event}: {message}")]
    Validation { event: String, message: String },

    /// A failure that will not succeed on retry.
    #[error("non-retriable: {message}")]
    NonRetriable {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A referenced record does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    /// A status update that the entity's transition table does not allow.
    #[error("illegal {entity} transition {from} -> {to}")]
    IllegalTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// The model declined to produce the requested content.
    #[error("model refused: {message}")]
    Refusal { message: String },

    /// Requested adapter or function was not registered.
    #[error("adapter not found: {adapter_type}/{name}")]
    AdapterNotFound { adapter_type: String, name: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LessonflowError {
    /// Shorthand for a [`LessonflowError::NonRetriable`] without a source.
    pub fn non_retriable(message: impl Into<String>) -> Self {
        Self::NonRetriable {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a [`LessonflowError::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Whether the queue should re-deliver the event after this error.
    pub fn is_retriable(&self) -> bool {
        !matches!(
            self,
            Self::Config(_)
                | Self::Validation { .. }
                | Self::NonRetriable { .. }
                | Self::NotFound { .. }
                | Self::IllegalTransition { .. }
                | Self::Refusal { .. }
                | Self::AdapterNotFound { .. }
        )
    }
}

impl From<serde_json::Error> for LessonflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(format!("json: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retriable() {
        let provider = LessonflowError::Provider {
            message: "503".into(),
            source: None,
        };
        assert!(provider.is_retriable());
        assert!(
            LessonflowError::Storage {
                source: Box::new(std::io::Error::other("locked")),
            }
            .is_retriable()
        );
        assert!(
            LessonflowError::Timeout {
                duration: std::time::Duration::from_secs(5),
            }
            .is_retriable()
        );
    }

    #[test]
    fn permanent_errors_stop_retries() {
        assert!(!LessonflowError::non_retriable("already processed").is_retriable());
        assert!(!LessonflowError::not_found("lesson", "l1").is_retriable());
        assert!(
            !LessonflowError::Validation {
                event: "app/lesson.summarise".into(),
                message: "missing lessonId".into(),
            }
            .is_retriable()
        );
        assert!(
            !LessonflowError::IllegalTransition {
                entity: "snippet",
                from: "SUCCESS".into(),
                to: "PENDING".into(),
            }
            .is_retriable()
        );
    }

    #[test]
    fn not_found_message_names_entity() {
        let err = LessonflowError::not_found("lessonPlan", "lp_1");
        assert_eq!(err.to_string(), "lessonPlan lp_1 not found");
    }
}
