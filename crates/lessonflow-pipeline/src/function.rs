// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The function contract and the name-to-function registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use lessonflow_bus::{Event, EventName};
use lessonflow_core::LessonflowError;
use serde_json::Value;

use crate::context::PipelineContext;
use crate::step::StepContext;

/// A unit of background work triggered by one event name.
#[async_trait]
pub trait PipelineFunction: Send + Sync + 'static {
    /// Stable identifier used in logs and metrics.
    fn id(&self) -> &'static str;

    /// The event that invokes this function.
    fn trigger(&self) -> EventName;

    /// Execute one invocation. The returned JSON is the invocation's result.
    async fn run(
        &self,
        ctx: &PipelineContext,
        step: &StepContext,
        event: &Event,
    ) -> Result<Value, LessonflowError>;

    /// Called once when the invocation has failed for good.
    async fn on_failure(
        &self,
        _ctx: &PipelineContext,
        _event: &Event,
        _error: &LessonflowError,
    ) -> Result<(), LessonflowError> {
        Ok(())
    }
}

/// One function per event name.
#[derive(Default, Clone)]
pub struct FunctionRegistry {
    functions: HashMap<EventName, Arc<dyn PipelineFunction>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `function` under its trigger. A second function for the same
    /// event is rejected.
    pub fn register(&mut self, function: Arc<dyn PipelineFunction>) -> Result<(), LessonflowError> {
        let trigger = function.trigger();
        if let Some(existing) = self.functions.get(&trigger) {
            return Err(LessonflowError::Internal(format!(
                "{trigger} already handled by {}, cannot register {}",
                existing.id(),
                function.id()
            )));
        }
        self.functions.insert(trigger, function);
        Ok(())
    }

    pub fn get(&self, name: EventName) -> Option<Arc<dyn PipelineFunction>> {
        self.functions.get(&name).cloned()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Registered function ids, sorted.
    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.functions.values().map(|f| f.id()).collect();
        ids.sort_unstable();
        ids
    }
}
