// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Lessonflow.
//!
//! Holds the shared error type, the per-entity status machines, the clock
//! abstraction, and the adapter traits every external client implements.

pub mod clock;
pub mod error;
pub mod status;
pub mod traits;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::LessonflowError;
pub use status::{
    GenerationStatus, LessonPlanPartStatus, LessonPlanStatus, LessonSummaryStatus,
    QuizAnswerStatus, QuizQuestionStatus, SnippetStatus, StatusMachine, TranscriptStatus,
    transition,
};
pub use types::{AdapterType, HealthStatus};

pub use traits::{
    AnalyticsAdapter, CompletionAdapter, EmbeddingAdapter, IdentityAdapter, ModerationAdapter,
    NotifierAdapter, PluginAdapter,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_type_display_round_trips() {
        use std::str::FromStr;

        for variant in [
            AdapterType::Completion,
            AdapterType::Embedding,
            AdapterType::Moderation,
            AdapterType::Identity,
            AdapterType::Analytics,
            AdapterType::Notifier,
            AdapterType::Storage,
        ] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn all_traits_are_object_safe() {
        fn _completion(_: &dyn CompletionAdapter) {}
        fn _embedding(_: &dyn EmbeddingAdapter) {}
        fn _moderation(_: &dyn ModerationAdapter) {}
        fn _identity(_: &dyn IdentityAdapter) {}
        fn _analytics(_: &dyn AnalyticsAdapter) {}
        fn _notifier(_: &dyn NotifierAdapter) {}
    }
}
