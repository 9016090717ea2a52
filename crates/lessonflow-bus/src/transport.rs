// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Where validated events go after the bus accepts them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lessonflow_core::LessonflowError;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::events::EventName;

/// The user an event acts on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventUser {
    pub id: String,
}

/// An accepted event. Immutable once built by the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub name: EventName,
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<EventUser>,
    pub ts: DateTime<Utc>,
}

impl Event {
    /// Deserialize the payload into its typed form.
    pub fn payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, LessonflowError> {
        serde_json::from_value(self.data.clone()).map_err(|e| LessonflowError::Validation {
            event: self.name.to_string(),
            message: e.to_string(),
        })
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }
}

/// Delivery backend for accepted events.
#[async_trait]
pub trait EventTransport: Send + Sync {
    async fn publish(&self, event: &Event) -> Result<(), LessonflowError>;
}

/// Keeps published events in memory.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    events: Mutex<Vec<Event>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far.
    pub async fn events(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }

    pub async fn names(&self) -> Vec<EventName> {
        self.events.lock().await.iter().map(|e| e.name).collect()
    }

    /// Remove and return everything published so far.
    pub async fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().await)
    }
}

#[async_trait]
impl EventTransport for MemoryTransport {
    async fn publish(&self, event: &Event) -> Result<(), LessonflowError> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}
