// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use lessonflow_bus::{Event, EventName};
use lessonflow_core::LessonflowError;
use serde_json::{Value, json};

use crate::context::PipelineContext;
use crate::function::PipelineFunction;
use crate::step::StepContext;

/// Liveness check for the queue and worker.
pub struct Healthcheck;

#[async_trait]
impl PipelineFunction for Healthcheck {
    fn id(&self) -> &'static str {
        "healthcheck"
    }

    fn trigger(&self) -> EventName {
        EventName::Healthcheck
    }

    async fn run(
        &self,
        _ctx: &PipelineContext,
        _step: &StepContext,
        _event: &Event,
    ) -> Result<Value, LessonflowError> {
        Ok(json!({ "ok": true }))
    }
}
