// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification of a violation: what the user did, who caught it, and
//! which record it concerns.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserAction {
    ChatMessage,
    QuizGeneration,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
pub enum DetectionSource {
    #[strum(serialize = "OPENAI")]
    #[serde(rename = "OPENAI")]
    OpenAi,
    #[strum(serialize = "HELICONE")]
    #[serde(rename = "HELICONE")]
    Helicone,
    #[strum(serialize = "MODERATION")]
    #[serde(rename = "MODERATION")]
    Moderation,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordType {
    Message,
    Generation,
    ChatSession,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn stored_names() {
        assert_eq!(UserAction::QuizGeneration.to_string(), "QUIZ_GENERATION");
        assert_eq!(DetectionSource::OpenAi.to_string(), "OPENAI");
        assert_eq!(RecordType::ChatSession.to_string(), "CHAT_SESSION");
        assert_eq!(
            DetectionSource::from_str("HELICONE").unwrap(),
            DetectionSource::Helicone
        );
    }
}
