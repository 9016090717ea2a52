// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-entity processing statuses and their transition tables.
//!
//! Every processable record carries a status from its own closed enum. The
//! only way to move a record forward is [`transition`], which rejects any
//! move the entity's table does not list. Terminal statuses have no
//! successors, so re-asserting them is rejected as well.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::LessonflowError;

/// A status enum with an explicit successor table.
pub trait StatusMachine:
    Copy + Eq + std::fmt::Display + std::str::FromStr + IntoEnumIterator + 'static
{
    /// Entity name used in errors and logs.
    const ENTITY: &'static str;

    /// Statuses this one may move to.
    fn allowed_next(self) -> &'static [Self];

    /// Whether no further transition is possible.
    fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }

    /// Parse the stored column value.
    fn parse_stored(value: &str) -> Result<Self, LessonflowError> {
        value
            .parse::<Self>()
            .map_err(|_| LessonflowError::Internal(format!("unknown {} status `{value}`", Self::ENTITY)))
    }
}

/// Validate `from -> to` against the entity's table and return the new status.
pub fn transition<S: StatusMachine>(from: S, to: S) -> Result<S, LessonflowError> {
    if from.allowed_next().contains(&to) {
        Ok(to)
    } else {
        Err(LessonflowError::IllegalTransition {
            entity: S::ENTITY,
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

macro_rules! status_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter,
            Serialize, Deserialize,
        )]
        #[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Column value as stored in SQLite.
            pub fn as_str(&self) -> &str {
                self.as_ref()
            }
        }
    };
}

status_enum!(
    /// Lifecycle of a user-requested generation.
    GenerationStatus {
        Requested, Pending, Moderating, Generating, Success, Failed, Flagged,
    }
);

impl StatusMachine for GenerationStatus {
    const ENTITY: &'static str = "generation";

    fn allowed_next(self) -> &'static [Self] {
        use GenerationStatus::*;
        match self {
            Requested => &[Pending, Failed],
            // A cached response for identical inputs skips straight to SUCCESS.
            Pending => &[Moderating, Generating, Success, Failed, Flagged],
            Moderating => &[Generating, Flagged, Failed],
            Generating => &[Success, Failed, Flagged],
            Success | Failed | Flagged => &[],
        }
    }
}

status_enum!(
    /// Lifecycle of a generated lesson plan.
    LessonPlanStatus {
        Pending, Generating, Generated, Success, Failed,
    }
);

impl StatusMachine for LessonPlanStatus {
    const ENTITY: &'static str = "lessonPlan";

    fn allowed_next(self) -> &'static [Self] {
        use LessonPlanStatus::*;
        match self {
            Pending => &[Generating, Failed],
            Generating => &[Generated, Failed],
            Generated => &[Success, Failed],
            Success | Failed => &[],
        }
    }
}

status_enum!(
    /// Lifecycle of a lesson summary.
    LessonSummaryStatus {
        Pending, Generated, Success, Failed,
    }
);

impl StatusMachine for LessonSummaryStatus {
    const ENTITY: &'static str = "lessonSummary";

    fn allowed_next(self) -> &'static [Self] {
        use LessonSummaryStatus::*;
        match self {
            Pending => &[Generated, Failed],
            Generated => &[Success, Failed],
            Success | Failed => &[],
        }
    }
}

status_enum!(
    /// Lifecycle of a lesson plan section.
    LessonPlanPartStatus { Pending, Success, Failed }
);

status_enum!(
    /// Lifecycle of a quiz question embedding.
    QuizQuestionStatus { Pending, Success, Failed }
);

status_enum!(
    /// Lifecycle of a quiz answer embedding.
    QuizAnswerStatus { Pending, Success, Failed }
);

status_enum!(
    /// Lifecycle of a transcript snippet embedding.
    SnippetStatus { Pending, Success, Failed }
);

status_enum!(
    /// Lifecycle of a transcript split.
    TranscriptStatus { Pending, Success, Failed }
);

macro_rules! embed_only_machine {
    ($($name:ident => $entity:literal),+ $(,)?) => {
        $(
            impl StatusMachine for $name {
                const ENTITY: &'static str = $entity;

                fn allowed_next(self) -> &'static [Self] {
                    match self {
                        $name::Pending => &[$name::Success, $name::Failed],
                        $name::Success | $name::Failed => &[],
                    }
                }
            }
        )+
    };
}

embed_only_machine!(
    LessonPlanPartStatus => "lessonPlanPart",
    QuizQuestionStatus => "quizQuestion",
    QuizAnswerStatus => "quizAnswer",
    SnippetStatus => "snippet",
    TranscriptStatus => "transcript",
);
