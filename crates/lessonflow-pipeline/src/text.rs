// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text shaping for prompts and embedding inputs.

use lessonflow_core::LessonflowError;
use serde_json::{Map, Value};

/// Flatten a JSON value into readable text.
///
/// Strings are kept as-is, arrays become one item per line, and objects
/// become `key: value` lines. Null is empty.
pub fn textify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(items) => items
            .iter()
            .map(textify)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{k}: {}", textify(v)))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// `learningObjectives` -> `Learning objectives`.
pub fn sentence_case(key: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    for c in key.chars() {
        if c == '_' || c == '-' || c == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else if c.is_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
            current.extend(c.to_lowercase());
        } else {
            current.extend(c.to_lowercase());
        }
    }
    if !current.is_empty() {
        words.push(current);
    }

    let joined = words.join(" ");
    let mut chars = joined.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Whether a generated value counts as absent.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty() || s == "None",
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Substitute `{name}` placeholders in `template` from `inputs`.
///
/// `{{` and `}}` produce literal braces. Non-string inputs are inserted as
/// JSON. A placeholder with no matching input is a non-retriable error.
pub fn format_template(template: &str, inputs: &Map<String, Value>) -> Result<String, LessonflowError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for n in chars.by_ref() {
                    if n == '}' {
                        closed = true;
                        break;
                    }
                    name.push(n);
                }
                if !closed {
                    return Err(LessonflowError::non_retriable(format!(
                        "unclosed placeholder `{{{name}` in prompt template"
                    )));
                }
                let value = inputs.get(name.trim()).ok_or_else(|| {
                    LessonflowError::non_retriable(format!(
                        "prompt template needs input `{}`",
                        name.trim()
                    ))
                })?;
                match value {
                    Value::String(s) => out.push_str(s),
                    other => out.push_str(&other.to_string()),
                }
            }
            _ => out.push(c),
        }
    }
    Ok(out)
}
