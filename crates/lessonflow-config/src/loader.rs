// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered config loading with Figment.
//!
//! `./lessonflow.toml` > `~/.config/lessonflow/lessonflow.toml` >
//! `/etc/lessonflow/lessonflow.toml`, then `LESSONFLOW_*` environment
//! variables and the legacy unprefixed variables on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::LessonflowConfig;

const SYSTEM_CONFIG: &str = "/etc/lessonflow/lessonflow.toml";
const LOCAL_CONFIG: &str = "lessonflow.toml";

/// Sections that `LESSONFLOW_<SECTION>_<KEY>` may address.
const SECTIONS: &[&str] = &[
    "app",
    "storage",
    "bus",
    "worker",
    "scanner",
    "openai",
    "embedding",
    "moderation",
    "generation",
    "safety",
    "identity",
    "analytics",
    "slack",
];

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/lessonflow/lessonflow.toml`
/// 3. `~/.config/lessonflow/lessonflow.toml`
/// 4. `./lessonflow.toml`
/// 5. `SAFETY_VIOLATIONS_MAX_ALLOWED`, `SAFETY_VIOLATION_WINDOW_DAYS`,
///    `PROMPT_PLAYBACK_ENABLED`
/// 6. `LESSONFLOW_*` environment variables
pub fn load_config() -> Result<LessonflowConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<LessonflowConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LessonflowConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<LessonflowConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LessonflowConfig::default()))
        .merge(Toml::file(path))
        .merge(legacy_env())
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(LessonflowConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("lessonflow/lessonflow.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(legacy_env())
        .merge(env_provider())
}

/// `LESSONFLOW_SAFETY_WINDOW_DAYS` -> `safety.window_days`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores themselves.
fn env_provider() -> Env {
    Env::prefixed("LESSONFLOW_").map(|key| map_env_key(&key.as_str().to_ascii_lowercase()).into())
}

pub(crate) fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

/// Unprefixed variables the deployment environment already sets.
fn legacy_env() -> Env {
    Env::raw()
        .only(&[
            "SAFETY_VIOLATIONS_MAX_ALLOWED",
            "SAFETY_VIOLATION_WINDOW_DAYS",
            "PROMPT_PLAYBACK_ENABLED",
        ])
        .map(|key| match key.as_str().to_ascii_lowercase().as_str() {
            "safety_violations_max_allowed" => "safety.max_allowed_violations".into(),
            "safety_violation_window_days" => "safety.window_days".into(),
            "prompt_playback_enabled" => "generation.prompt_playback".into(),
            other => other.to_string().into(),
        })
}
