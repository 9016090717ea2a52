// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is a
//! startup error rather than a silently ignored setting.

use serde::{Deserialize, Serialize};

/// Top-level Lessonflow configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LessonflowConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub app: AppConfig,

    /// SQLite settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Event bus settings.
    #[serde(default)]
    pub bus: BusConfig,

    /// Queue worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Batch scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// OpenAI-compatible API settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Embedding cache settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Input moderation settings.
    #[serde(default)]
    pub moderation: ModerationConfig,

    /// User-requested generation settings.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Safety violation thresholds.
    #[serde(default)]
    pub safety: SafetyConfig,

    /// Identity provider settings.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Product analytics settings.
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Team chat webhook settings.
    #[serde(default)]
    pub slack: SlackConfig,
}

/// Process identity and logging.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_app_name() -> String {
    "lessonflow".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// SQLite settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|d| d.join("lessonflow").join("lessonflow.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("lessonflow.db"))
        .display()
        .to_string()
}

fn default_true() -> bool {
    true
}

/// Event bus settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BusConfig {
    /// Credential presented to the event transport. Only a redacted fragment
    /// is ever logged.
    #[serde(default)]
    pub event_key: Option<String>,
}

/// Queue worker settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Number of concurrent polling loops.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Delay between polls when the queue is empty.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long a dequeued event stays locked before another worker may take it.
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,

    /// Deliveries before an event is failed permanently.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            poll_interval_ms: default_poll_interval_ms(),
            lock_timeout_secs: default_lock_timeout_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_lock_timeout_secs() -> u64 {
    300
}

fn default_max_attempts() -> u32 {
    3
}

/// Batch scanner settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScannerConfig {
    /// Records read per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Pause between pages of lessons sent for summarisation, to stay under
    /// provider rate limits.
    #[serde(default = "default_summarise_page_delay_ms")]
    pub summarise_page_delay_ms: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            summarise_page_delay_ms: default_summarise_page_delay_ms(),
        }
    }
}

fn default_page_size() -> u32 {
    100
}

fn default_summarise_page_delay_ms() -> u64 {
    4000
}

/// OpenAI-compatible API settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    /// API key. `None` falls back to `OPENAI_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default = "default_completion_model")]
    pub completion_model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_base_url(),
            completion_model: default_completion_model(),
            embedding_model: default_embedding_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_completion_model() -> String {
    "gpt-4o".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Embedding cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    /// Reuse vectors for identical text.
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    #[serde(default = "default_cache_ttl_days")]
    pub cache_ttl_days: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_ttl_days: default_cache_ttl_days(),
        }
    }
}

fn default_cache_ttl_days() -> u32 {
    30
}

/// Input moderation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModerationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Category score above which input is flagged.
    #[serde(default = "default_moderation_threshold")]
    pub threshold: f64,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: default_moderation_threshold(),
        }
    }
}

fn default_moderation_threshold() -> f64 {
    0.1
}

/// User-requested generation settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationConfig {
    /// Answer a request with the stored response of an earlier successful
    /// generation for the same prompt and inputs, instead of calling the
    /// model. Meant for demos and load tests.
    #[serde(default)]
    pub prompt_playback: bool,
}

/// Safety violation thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SafetyConfig {
    /// Violations tolerated inside the window. One more bans the user.
    #[serde(default = "default_max_allowed_violations")]
    pub max_allowed_violations: u32,

    /// Rolling window length in days.
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    /// Feature flag that exempts a user from bans.
    #[serde(default = "default_tester_flag")]
    pub tester_flag: String,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            max_allowed_violations: default_max_allowed_violations(),
            window_days: default_window_days(),
            tester_flag: default_tester_flag(),
        }
    }
}

fn default_max_allowed_violations() -> u32 {
    5
}

fn default_window_days() -> u32 {
    30
}

fn default_tester_flag() -> String {
    "safety-testing".to_string()
}

/// Identity provider settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    /// Backend secret key. `None` falls back to `CLERK_SECRET_KEY`.
    #[serde(default)]
    pub secret_key: Option<String>,

    #[serde(default = "default_identity_base_url")]
    pub base_url: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            base_url: default_identity_base_url(),
        }
    }
}

fn default_identity_base_url() -> String {
    "https://api.clerk.com/v1".to_string()
}

/// Product analytics settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyticsConfig {
    /// Project API key. `None` disables capture.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_analytics_host")]
    pub host: String,

    /// Buffered events that trigger a flush.
    #[serde(default = "default_flush_at")]
    pub flush_at: usize,

    /// Seconds between background flushes while serving.
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            host: default_analytics_host(),
            flush_at: default_flush_at(),
            flush_interval_secs: default_flush_interval_secs(),
        }
    }
}

fn default_flush_at() -> usize {
    20
}

fn default_flush_interval_secs() -> u64 {
    10
}

fn default_analytics_host() -> String {
    "https://eu.posthog.com".to_string()
}

/// Team chat webhook settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SlackConfig {
    /// Incoming webhook URL. `None` logs notifications instead of posting.
    #[serde(default)]
    pub webhook_url: Option<String>,
}
