// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Secret redaction for log output and error messages.
//!
//! Known credential shapes are matched by regex; configured secrets loaded at
//! startup are matched exactly.

use std::io::Write;
use std::sync::{Arc, LazyLock, RwLock};

use regex::Regex;
use tracing_subscriber::fmt::MakeWriter;

static REDACTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // OpenAI keys, including project keys: sk-proj-...
        Regex::new(r"sk-(?:proj-)?[a-zA-Z0-9_\-]{20,}").unwrap(),
        // Clerk backend keys: sk_live_... / sk_test_...
        Regex::new(r"sk_(?:live|test)_[a-zA-Z0-9]{20,}").unwrap(),
        // PostHog project keys
        Regex::new(r"phc_[a-zA-Z0-9]{20,}").unwrap(),
        // Slack incoming webhooks carry their secret in the path
        Regex::new(r"https://hooks\.slack\.com/services/[A-Za-z0-9/]+").unwrap(),
        Regex::new(r"Bearer\s+[a-zA-Z0-9._\-]{10,}").unwrap(),
    ]
});

const REDACTED: &str = "[REDACTED]";

/// Redact known secret shapes and the given exact values from `input`.
pub fn redact(input: &str, secrets: &[String]) -> String {
    let mut result = input.to_string();

    for pattern in REDACTION_PATTERNS.iter() {
        result = pattern.replace_all(&result, REDACTED).into_owned();
    }

    // Longest first so a secret that contains another is not half-replaced.
    let mut sorted: Vec<&String> = secrets.iter().filter(|s| !s.is_empty()).collect();
    sorted.sort_by_key(|v| std::cmp::Reverse(v.len()));
    for value in sorted {
        result = result.replace(value.as_str(), REDACTED);
    }

    result
}

/// A loggable stand-in for a credential: `****` plus its last four characters.
///
/// Short values are masked entirely.
pub fn key_fragment(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

/// A writer wrapper that redacts secrets before forwarding bytes.
pub struct RedactingWriter<W> {
    inner: W,
    secrets: Arc<RwLock<Vec<String>>>,
}

impl<W: Write> RedactingWriter<W> {
    pub fn new(inner: W, secrets: Arc<RwLock<Vec<String>>>) -> Self {
        Self { inner, secrets }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let input = String::from_utf8_lossy(buf);
        let secrets = self
            .secrets
            .read()
            .map(|v| v.clone())
            .unwrap_or_default();
        self.inner.write_all(redact(&input, &secrets).as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// `tracing-subscriber` writer factory producing redacting stderr writers.
#[derive(Clone, Default)]
pub struct RedactingMakeWriter {
    secrets: Arc<RwLock<Vec<String>>>,
}

impl RedactingMakeWriter {
    /// Writer factory that also masks each non-empty value in `secrets`.
    pub fn new(secrets: impl IntoIterator<Item = String>) -> Self {
        let secrets = secrets.into_iter().filter(|s| !s.is_empty()).collect();
        Self {
            secrets: Arc::new(RwLock::new(secrets)),
        }
    }

    /// Register another exact value to mask.
    pub fn add_secret(&self, value: String) {
        if value.is_empty() {
            return;
        }
        if let Ok(mut values) = self.secrets.write() {
            if !values.contains(&value) {
                values.push(value);
            }
        }
    }
}

impl<'a> MakeWriter<'a> for RedactingMakeWriter {
    type Writer = RedactingWriter<std::io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new(std::io::stderr(), Arc::clone(&self.secrets))
    }
}
