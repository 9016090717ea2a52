// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compiled payload validators, one per [`EventName`].

use std::collections::HashMap;
use std::str::FromStr;

use lessonflow_core::LessonflowError;
use strum::IntoEnumIterator;

use crate::events::EventName;

/// Maximum number of schema violations reported for one payload.
const MAX_REPORTED_ERRORS: usize = 5;

/// The set of accepted event names and the shape of their payloads.
pub struct EventCatalog {
    validators: HashMap<EventName, jsonschema::Validator>,
}

impl std::fmt::Debug for EventCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventCatalog")
            .field("events", &self.validators.len())
            .finish()
    }
}

impl EventCatalog {
    /// Compile a validator for every event name.
    pub fn new() -> Result<Self, LessonflowError> {
        let mut validators = HashMap::new();
        for name in EventName::iter() {
            let schema = name.schema();
            let validator = jsonschema::validator_for(&schema).map_err(|e| {
                LessonflowError::Internal(format!("schema for {name} does not compile: {e}"))
            })?;
            validators.insert(name, validator);
        }
        Ok(Self { validators })
    }

    /// Parse a wire name, rejecting names outside the catalog.
    pub fn parse_name(raw: &str) -> Result<EventName, LessonflowError> {
        EventName::from_str(raw).map_err(|_| LessonflowError::Validation {
            event: raw.to_string(),
            message: "unknown event name".to_string(),
        })
    }

    /// Check `data` against the schema declared for `name`.
    pub fn validate(
        &self,
        name: EventName,
        data: &serde_json::Value,
    ) -> Result<(), LessonflowError> {
        let validator = self.validators.get(&name).ok_or_else(|| {
            LessonflowError::Internal(format!("no validator compiled for {name}"))
        })?;

        let problems: Vec<String> = validator
            .iter_errors(data)
            .take(MAX_REPORTED_ERRORS)
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{path}: {e}")
                }
            })
            .collect();

        if problems.is_empty() {
            Ok(())
        } else {
            Err(LessonflowError::Validation {
                event: name.to_string(),
                message: problems.join("; "),
            })
        }
    }

    /// Check the payload and, where the event demands one, the acting user.
    pub fn validate_event(
        &self,
        name: EventName,
        data: &serde_json::Value,
        user_id: Option<&str>,
    ) -> Result<(), LessonflowError> {
        self.validate(name, data)?;
        if name.requires_user() && user_id.is_none_or(str::is_empty) {
            return Err(LessonflowError::Validation {
                event: name.to_string(),
                message: "event requires a user".to_string(),
            });
        }
        Ok(())
    }
}
