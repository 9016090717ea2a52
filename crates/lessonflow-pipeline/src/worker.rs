// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue worker.
//!
//! Claims the oldest pending event, runs the function registered for its
//! name, and settles the row: `ack` on success, `fail` (re-queued until
//! `max_attempts`) for retriable errors, `fail_permanently` otherwise. Rows
//! locked by a crashed worker are handed back on every poll.

use std::sync::Arc;
use std::time::Duration;

use lessonflow_config::model::WorkerConfig;
use lessonflow_core::LessonflowError;
use lessonflow_storage::EventRecord;
use lessonflow_storage::queries::events;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::context::PipelineContext;
use crate::function::{FunctionRegistry, PipelineFunction};
use crate::queue::event_from_record;
use crate::step::StepContext;

/// How a claimed event was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Completed,
    /// Failed with a retriable error and returned to the queue.
    Retrying,
    Failed,
    /// No function is registered for the event name.
    Unhandled,
}

#[derive(Debug, Clone)]
pub struct WorkerOptions {
    pub concurrency: usize,
    pub poll_interval: Duration,
    pub lock_timeout_secs: u64,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self::from(&WorkerConfig::default())
    }
}

impl From<&WorkerConfig> for WorkerOptions {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            lock_timeout_secs: config.lock_timeout_secs,
        }
    }
}

#[derive(Clone)]
pub struct Worker {
    ctx: PipelineContext,
    registry: Arc<FunctionRegistry>,
    options: WorkerOptions,
}

impl Worker {
    pub fn new(ctx: PipelineContext, registry: FunctionRegistry, options: WorkerOptions) -> Self {
        Self {
            ctx,
            registry: Arc::new(registry),
            options,
        }
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Claim and settle one event. Returns `None` when the queue is empty.
    pub async fn process_next(&self) -> Result<Option<Settlement>, LessonflowError> {
        let released = events::release_expired(&self.ctx.db).await?;
        if released > 0 {
            warn!(count = released, "released events with expired locks");
        }

        let Some(record) = events::dequeue(&self.ctx.db, self.options.lock_timeout_secs).await?
        else {
            return Ok(None);
        };

        let settlement = self.settle(record).await?;
        metrics::counter!(
            "lessonflow_events_processed_total",
            "outcome" => format!("{settlement:?}").to_lowercase()
        )
        .increment(1);
        Ok(Some(settlement))
    }

    async fn settle(&self, record: EventRecord) -> Result<Settlement, LessonflowError> {
        let event = match event_from_record(&record) {
            Ok(event) => event,
            Err(e) => {
                error!(seq = record.seq, name = %record.name, error = %e, "undeliverable event");
                events::fail_permanently(&self.ctx.db, record.seq, &e.to_string()).await?;
                return Ok(Settlement::Failed);
            }
        };

        let Some(function) = self.registry.get(event.name) else {
            debug!(event = %event.name, "no function registered, acknowledging");
            events::ack(&self.ctx.db, record.seq).await?;
            return Ok(Settlement::Unhandled);
        };

        let span = info_span!(
            "function",
            function = function.id(),
            event = %event.name,
            event_id = %event.id,
            attempt = record.attempts + 1,
        );
        let step = StepContext::new(self.ctx.db.clone(), self.ctx.bus.clone(), &event.id);
        let result = function
            .run(&self.ctx, &step, &event)
            .instrument(span.clone())
            .await;

        match result {
            Ok(output) => {
                debug!(parent: &span, %output, "function completed");
                events::ack(&self.ctx.db, record.seq).await?;
                Ok(Settlement::Completed)
            }
            Err(e) if e.is_retriable() => {
                let retry = events::fail(&self.ctx.db, record.seq, &e.to_string()).await?;
                if retry {
                    warn!(parent: &span, error = %e, "function failed, will retry");
                    Ok(Settlement::Retrying)
                } else {
                    error!(parent: &span, error = %e, "function failed, attempts exhausted");
                    self.handle_failure(function.as_ref(), &event, &e)
                        .instrument(span)
                        .await;
                    Ok(Settlement::Failed)
                }
            }
            Err(e) => {
                error!(parent: &span, error = %e, "function failed permanently");
                events::fail_permanently(&self.ctx.db, record.seq, &e.to_string()).await?;
                self.handle_failure(function.as_ref(), &event, &e)
                    .instrument(span)
                    .await;
                Ok(Settlement::Failed)
            }
        }
    }

    async fn handle_failure(
        &self,
        function: &dyn PipelineFunction,
        event: &lessonflow_bus::Event,
        cause: &LessonflowError,
    ) {
        if let Err(e) = function.on_failure(&self.ctx, event, cause).await {
            error!(error = %e, "failure handler errored");
        }
    }

    /// Process events until the queue is empty, including events sent by the
    /// functions themselves. Returns how many events were settled.
    ///
    /// Retrying events are picked up again immediately, so a function that
    /// keeps failing is attempted `max_attempts` times before this returns.
    pub async fn drain(&self) -> Result<usize, LessonflowError> {
        let mut settled = 0;
        while self.process_next().await?.is_some() {
            settled += 1;
        }
        Ok(settled)
    }

    /// Poll with `concurrency` loops until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), LessonflowError> {
        info!(
            concurrency = self.options.concurrency,
            functions = self.registry.len(),
            "worker started"
        );

        let mut loops = tokio::task::JoinSet::new();
        for n in 0..self.options.concurrency {
            let worker = self.clone();
            let cancel = cancel.clone();
            loops.spawn(
                async move { worker.poll_loop(cancel).await }
                    .instrument(info_span!("worker", n)),
            );
        }

        while let Some(joined) = loops.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "worker loop panicked");
            }
        }
        info!("worker stopped");
        Ok(())
    }

    async fn poll_loop(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.options.poll_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    // Work through whatever is queued before waiting again.
                    loop {
                        if cancel.is_cancelled() {
                            break;
                        }
                        match self.process_next().await {
                            Ok(Some(_)) => continue,
                            Ok(None) => break,
                            Err(e) => {
                                error!(error = %e, "queue poll failed");
                                break;
                            }
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    debug!("worker loop cancelled");
                    break;
                }
            }
        }
    }
}
