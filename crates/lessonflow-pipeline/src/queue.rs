// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bus transport that appends to the durable SQLite event queue.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lessonflow_bus::{Event, EventCatalog, EventTransport, EventUser};
use lessonflow_core::LessonflowError;
use lessonflow_storage::queries::events;
use lessonflow_storage::{Database, EventRecord};

pub struct QueueTransport {
    db: Database,
    max_attempts: u32,
}

impl QueueTransport {
    pub fn new(db: Database, max_attempts: u32) -> Self {
        Self { db, max_attempts }
    }
}

#[async_trait]
impl EventTransport for QueueTransport {
    async fn publish(&self, event: &Event) -> Result<(), LessonflowError> {
        let payload = serde_json::to_string(&event.data)?;
        events::enqueue(
            &self.db,
            &event.id,
            event.name.as_ref(),
            &payload,
            event.user_id(),
            self.max_attempts,
        )
        .await?;
        Ok(())
    }
}

/// Rebuild the bus event from a queued row.
///
/// Unknown names and unreadable payloads are validation failures; the row
/// can never be handled and should not be retried.
pub fn event_from_record(record: &EventRecord) -> Result<Event, LessonflowError> {
    let name = EventCatalog::parse_name(&record.name)?;
    let data = serde_json::from_str(&record.payload).map_err(|e| LessonflowError::Validation {
        event: record.name.clone(),
        message: format!("stored payload is not JSON: {e}"),
    })?;
    let ts = DateTime::parse_from_rfc3339(&record.created_at)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    Ok(Event {
        id: record.id.clone(),
        name,
        data,
        user: record.user_id.clone().map(|id| EventUser { id }),
        ts,
    })
}
