// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memoized steps.
//!
//! A step's JSON output is stored under `(event id, step name)` the first
//! time it succeeds. When the worker re-runs a failed invocation, completed
//! steps return their stored output instead of executing again, so side
//! effects inside a step happen at most once per event. Step names must be
//! unique within one invocation.

use std::future::Future;
use std::time::Duration;

use lessonflow_bus::{EventBus, EventName};
use lessonflow_core::LessonflowError;
use lessonflow_storage::Database;
use lessonflow_storage::queries::steps;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Step runner bound to one event.
#[derive(Clone)]
pub struct StepContext {
    db: Database,
    bus: EventBus,
    event_id: String,
}

impl StepContext {
    pub fn new(db: Database, bus: EventBus, event_id: impl Into<String>) -> Self {
        Self {
            db,
            bus,
            event_id: event_id.into(),
        }
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    /// Run `f` once per event under `name`, replaying its stored output on retry.
    pub async fn run<T, F, Fut>(&self, name: &str, f: F) -> Result<T, LessonflowError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, LessonflowError>>,
    {
        if let Some(stored) = steps::get_step(&self.db, &self.event_id, name).await? {
            debug!(step = name, "step replayed");
            return serde_json::from_str(&stored).map_err(|e| {
                LessonflowError::Internal(format!("stored output of step {name} is unreadable: {e}"))
            });
        }

        let output = f().await?;
        let encoded = serde_json::to_string(&output)?;
        steps::save_step(&self.db, &self.event_id, name, &encoded).await?;
        debug!(step = name, "step completed");
        Ok(output)
    }

    /// Send an event as a step, so a retried invocation does not send it twice.
    pub async fn send_event(
        &self,
        name: &str,
        event: EventName,
        data: serde_json::Value,
        user_id: Option<&str>,
    ) -> Result<String, LessonflowError> {
        let bus = &self.bus;
        self.run(name, || async move { bus.send(event, data, user_id).await })
            .await
    }

    /// Pause as a step. A replayed sleep returns immediately.
    pub async fn sleep(&self, name: &str, duration: Duration) -> Result<(), LessonflowError> {
        self.run(name, || async move {
            tokio::time::sleep(duration).await;
            Ok(())
        })
        .await
    }
}
