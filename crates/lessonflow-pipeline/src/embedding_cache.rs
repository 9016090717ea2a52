// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter decorator backed by the `embedding_cache` table.
//!
//! Texts already embedded by the same model within the TTL are served from
//! SQLite; only misses reach the provider. Expired entries are overwritten
//! when their text comes back, and purged in bulk at most once every
//! [`PURGE_INTERVAL_MINUTES`] of clock time.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lessonflow_core::clock::to_db_timestamp;
use lessonflow_core::types::{EmbeddingInput, EmbeddingOutput};
use lessonflow_core::{
    AdapterType, Clock, EmbeddingAdapter, HealthStatus, LessonflowError, PluginAdapter,
};
use lessonflow_storage::Database;
use lessonflow_storage::queries::embedding_cache;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Minimum clock time between two purges of expired entries.
pub const PURGE_INTERVAL_MINUTES: i64 = 60;

pub struct CachedEmbedder {
    inner: Arc<dyn EmbeddingAdapter>,
    db: Database,
    model: String,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
    last_purge: Mutex<Option<DateTime<Utc>>>,
}

impl CachedEmbedder {
    pub fn new(
        inner: Arc<dyn EmbeddingAdapter>,
        db: Database,
        model: impl Into<String>,
        ttl_days: u32,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner,
            db,
            model: model.into(),
            ttl: chrono::Duration::days(i64::from(ttl_days)),
            clock,
            last_purge: Mutex::new(None),
        }
    }

    /// Drop expired entries unless the last purge was under
    /// [`PURGE_INTERVAL_MINUTES`] ago.
    /// Failures are logged; a stale row only costs disk space.
    async fn purge_if_due(&self, now: DateTime<Utc>) {
        let mut last = self.last_purge.lock().await;
        let interval = chrono::Duration::minutes(PURGE_INTERVAL_MINUTES);
        if last.is_some_and(|at| now - at < interval) {
            return;
        }
        match embedding_cache::purge_expired(&self.db, &to_db_timestamp(now)).await {
            Ok(removed) => {
                debug!(removed, "expired embedding cache entries purged");
                *last = Some(now);
            }
            Err(e) => warn!(error = %e, "embedding cache purge failed"),
        }
    }
}

#[async_trait]
impl PluginAdapter for CachedEmbedder {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn version(&self) -> semver::Version {
        self.inner.version()
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, LessonflowError> {
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), LessonflowError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl EmbeddingAdapter for CachedEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, LessonflowError> {
        let now = self.clock.now();
        self.purge_if_due(now).await;
        let now_str = to_db_timestamp(now);
        let keys: Vec<String> = input
            .texts
            .iter()
            .map(|t| embedding_cache::cache_key(&self.model, t))
            .collect();

        let mut found: Vec<Option<Vec<f32>>> = Vec::with_capacity(keys.len());
        for key in &keys {
            found.push(embedding_cache::get(&self.db, key, &now_str).await?);
        }

        let missing: Vec<usize> = (0..found.len()).filter(|&i| found[i].is_none()).collect();
        debug!(
            texts = keys.len(),
            misses = missing.len(),
            "embedding cache lookup"
        );

        if !missing.is_empty() {
            let fresh = self
                .inner
                .embed(EmbeddingInput {
                    texts: missing.iter().map(|&i| input.texts[i].clone()).collect(),
                })
                .await?;
            if fresh.embeddings.len() != missing.len() {
                return Err(LessonflowError::Provider {
                    message: format!(
                        "expected {} embeddings, provider returned {}",
                        missing.len(),
                        fresh.embeddings.len()
                    ),
                    source: None,
                });
            }

            let expires_at = to_db_timestamp(now + self.ttl);
            for (&i, vector) in missing.iter().zip(fresh.embeddings) {
                embedding_cache::put(&self.db, &keys[i], &vector, &expires_at).await?;
                found[i] = Some(vector);
            }
        }

        let embeddings: Vec<Vec<f32>> = found.into_iter().flatten().collect();
        let dimensions = embeddings.first().map_or(0, Vec::len);
        Ok(EmbeddingOutput {
            embeddings,
            dimensions,
        })
    }
}
