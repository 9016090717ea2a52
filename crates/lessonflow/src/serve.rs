// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `lessonflow serve` command implementation.
//!
//! Constructs every client once, wires them into the pipeline context, and
//! runs the worker until a shutdown signal arrives.

use std::sync::Arc;

use lessonflow_bus::EventBus;
use lessonflow_clerk::ClerkIdentity;
use lessonflow_config::LessonflowConfig;
use lessonflow_core::{
    AnalyticsAdapter, Clock, EmbeddingAdapter, LessonflowError, PluginAdapter, SystemClock,
};
use lessonflow_openai::OpenAiProvider;
use lessonflow_pipeline::{
    CachedEmbedder, PipelineContext, PipelineSettings, QueueTransport, Worker, WorkerOptions,
    functions,
};
use lessonflow_posthog::PostHogAnalytics;
use lessonflow_safety::{SafetyPolicy, SafetyViolations};
use lessonflow_security::RedactingMakeWriter;
use lessonflow_slack::SlackNotifier;
use lessonflow_storage::Database;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::shutdown::install_signal_handler;

/// Configured values that must never appear in log output.
fn secrets(config: &LessonflowConfig) -> Vec<String> {
    [
        config.openai.api_key.clone(),
        config.identity.secret_key.clone(),
        config.analytics.api_key.clone(),
        config.slack.webhook_url.clone(),
        config.bus.event_key.clone(),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Install the global subscriber. `RUST_LOG` wins over `app.log_level`.
pub fn init_tracing(config: &LessonflowConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("lessonflow={},warn", config.app.log_level))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(RedactingMakeWriter::new(secrets(config)))
        .init();
}

/// Open the database and a bus that publishes onto its queue.
pub async fn open_queue(config: &LessonflowConfig) -> Result<(Database, EventBus), LessonflowError> {
    let db = Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?;
    let transport = Arc::new(QueueTransport::new(db.clone(), config.worker.max_attempts));
    let bus = EventBus::new(transport, config.bus.event_key.as_deref())?;
    Ok((db, bus))
}

/// External service clients, constructed once per process.
pub struct Adapters {
    pub openai: Arc<OpenAiProvider>,
    pub identity: Arc<ClerkIdentity>,
    pub analytics: Arc<PostHogAnalytics>,
    pub notifier: Arc<SlackNotifier>,
}

impl Adapters {
    pub fn from_config(config: &LessonflowConfig) -> Result<Self, LessonflowError> {
        Ok(Self {
            openai: Arc::new(OpenAiProvider::new(config)?),
            identity: Arc::new(ClerkIdentity::new(config)?),
            analytics: Arc::new(PostHogAnalytics::new(config)?),
            notifier: Arc::new(SlackNotifier::new(config)?),
        })
    }

    pub fn all(&self) -> Vec<Arc<dyn PluginAdapter>> {
        vec![
            self.openai.clone(),
            self.identity.clone(),
            self.analytics.clone(),
            self.notifier.clone(),
        ]
    }

    /// Flush and release every adapter, logging failures.
    pub async fn shutdown(&self) {
        for adapter in self.all() {
            if let Err(e) = adapter.shutdown().await {
                warn!(adapter = adapter.name(), error = %e, "adapter shutdown failed");
            }
        }
    }
}

/// Assemble the pipeline context and worker from configuration.
pub fn build_worker(
    config: &LessonflowConfig,
    db: &Database,
    bus: &EventBus,
    adapters: &Adapters,
) -> Result<Worker, LessonflowError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let embedder: Arc<dyn EmbeddingAdapter> = if config.embedding.cache_enabled {
        Arc::new(CachedEmbedder::new(
            adapters.openai.clone(),
            db.clone(),
            config.openai.embedding_model.clone(),
            config.embedding.cache_ttl_days,
            clock.clone(),
        ))
    } else {
        adapters.openai.clone()
    };

    let safety = SafetyViolations::new(
        db.clone(),
        adapters.identity.clone(),
        adapters.analytics.clone(),
        bus.clone(),
        clock.clone(),
        SafetyPolicy::from(&config.safety),
    );

    let ctx = PipelineContext {
        db: db.clone(),
        bus: bus.clone(),
        completion: adapters.openai.clone(),
        embedder,
        moderation: adapters.openai.clone(),
        notifier: adapters.notifier.clone(),
        safety,
        clock,
        settings: PipelineSettings::from(config),
    };

    Ok(Worker::new(
        ctx,
        functions::registry()?,
        WorkerOptions::from(&config.worker),
    ))
}

/// Flush buffered analytics on an interval until `cancel` fires.
fn spawn_analytics_flusher(
    analytics: Arc<PostHogAnalytics>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(analytics.flush_interval());
        // The first tick completes immediately.
        tick.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tick.tick() => {
                    if let Err(e) = analytics.flush().await {
                        warn!(error = %e, "periodic analytics flush failed");
                    }
                }
            }
        }
        debug!("analytics flusher stopped");
    })
}

/// Run the `lessonflow serve` command.
///
/// With `once`, drains the queue and returns instead of polling.
pub async fn run_serve(config: &LessonflowConfig, once: bool) -> Result<(), LessonflowError> {
    let (db, bus) = open_queue(config).await?;
    let adapters = Adapters::from_config(config)?;
    let worker = build_worker(config, &db, &bus, &adapters)?;

    info!(
        functions = worker.registry().len(),
        concurrency = config.worker.concurrency,
        database = %config.storage.database_path,
        "lessonflow worker starting"
    );

    let result = if once {
        worker.drain().await.map(|processed| {
            info!(processed, "queue drained");
        })
    } else {
        let cancel = install_signal_handler();
        let flusher = spawn_analytics_flusher(adapters.analytics.clone(), cancel.clone());
        let result = worker.run(cancel.clone()).await;
        cancel.cancel();
        if let Err(e) = flusher.await {
            warn!(error = %e, "analytics flusher task failed");
        }
        result
    };

    adapters.shutdown().await;
    db.close().await?;
    info!("lessonflow worker stopped");
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_collects_configured_values() {
        let mut config = LessonflowConfig::default();
        config.openai.api_key = Some("sk-test-123".into());
        config.slack.webhook_url = Some("https://hooks.slack.test/T0/B0/xyz".into());
        let values = secrets(&config);
        assert_eq!(values.len(), 2);
        assert!(values.contains(&"sk-test-123".to_string()));
        assert!(values.contains(&"https://hooks.slack.test/T0/B0/xyz".to_string()));
    }

    #[test]
    fn secrets_empty_by_default() {
        assert!(secrets(&LessonflowConfig::default()).is_empty());
    }

    #[tokio::test]
    async fn analytics_flusher_stops_on_cancel() {
        let config = LessonflowConfig::default();
        let analytics = Arc::new(PostHogAnalytics::new(&config).unwrap());
        let cancel = CancellationToken::new();
        let flusher = spawn_analytics_flusher(analytics, cancel.clone());
        cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), flusher)
            .await
            .expect("flusher stops after cancel")
            .unwrap();
    }

    #[tokio::test]
    async fn build_worker_registers_every_function() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = LessonflowConfig::default();
        config.storage.database_path = dir.path().join("lf.db").display().to_string();
        config.openai.api_key = Some("sk-test".into());
        config.identity.secret_key = Some("sk_clerk_test".into());

        let (db, bus) = open_queue(&config).await.unwrap();
        let adapters = Adapters::from_config(&config).unwrap();
        let worker = build_worker(&config, &db, &bus, &adapters).unwrap();
        assert_eq!(worker.registry().len(), functions::all().len());
        assert_eq!(adapters.all().len(), 4);
    }
}
