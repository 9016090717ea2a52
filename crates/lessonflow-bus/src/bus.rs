// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Validating event dispatcher.
//!
//! Every send is checked against the catalog before anything reaches the
//! transport. A rejected payload produces a `Validation` error and no event.
//! The bus itself never retries; redelivery is the worker's job.

use std::sync::Arc;

use chrono::Utc;
use lessonflow_core::LessonflowError;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::EventCatalog;
use crate::events::EventName;
use crate::transport::{Event, EventTransport, EventUser};

/// Validates events and hands them to a transport.
#[derive(Clone)]
pub struct EventBus {
    catalog: Arc<EventCatalog>,
    transport: Arc<dyn EventTransport>,
    key_fragment: String,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("key", &self.key_fragment)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Build a bus over `transport`.
    ///
    /// Only a masked fragment of `event_key` is retained, for log lines.
    pub fn new(
        transport: Arc<dyn EventTransport>,
        event_key: Option<&str>,
    ) -> Result<Self, LessonflowError> {
        Ok(Self {
            catalog: Arc::new(EventCatalog::new()?),
            transport,
            key_fragment: event_key
                .map(lessonflow_security::key_fragment)
                .unwrap_or_else(|| "unset".to_string()),
        })
    }

    pub fn catalog(&self) -> &EventCatalog {
        &self.catalog
    }

    /// Validate and dispatch an event. Returns the new event id.
    pub async fn send(
        &self,
        name: EventName,
        data: serde_json::Value,
        user_id: Option<&str>,
    ) -> Result<String, LessonflowError> {
        if let Err(e) = self.catalog.validate_event(name, &data, user_id) {
            warn!(event = %name, error = %e, "event rejected");
            metrics::counter!("lessonflow_events_rejected_total", "event" => name.to_string())
                .increment(1);
            return Err(e);
        }

        let event = Event {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            data,
            user: user_id.map(|id| EventUser { id: id.to_string() }),
            ts: Utc::now(),
        };

        info!(event = %name, key = %self.key_fragment, id = %event.id, "sending event");
        self.transport.publish(&event).await?;
        metrics::counter!("lessonflow_events_sent_total", "event" => name.to_string())
            .increment(1);
        debug!(id = %event.id, "event published");
        Ok(event.id)
    }

    /// Send a typed payload.
    pub async fn send_typed<T: Serialize>(
        &self,
        name: EventName,
        payload: &T,
        user_id: Option<&str>,
    ) -> Result<String, LessonflowError> {
        self.send(name, serde_json::to_value(payload)?, user_id).await
    }

    /// Send by wire name, rejecting names outside the catalog.
    pub async fn send_raw(
        &self,
        name: &str,
        data: serde_json::Value,
        user_id: Option<&str>,
    ) -> Result<String, LessonflowError> {
        let name = EventCatalog::parse_name(name)?;
        self.send(name, data, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{LessonRef, SubjectScope};
    use crate::transport::MemoryTransport;
    use serde_json::json;
    use tracing_test::traced_test;

    fn bus_with(key: Option<&str>) -> (EventBus, Arc<MemoryTransport>) {
        let transport = Arc::new(MemoryTransport::new());
        let bus = EventBus::new(transport.clone(), key).unwrap();
        (bus, transport)
    }

    #[tokio::test]
    async fn invalid_payload_never_reaches_transport() {
        let (bus, transport) = bus_with(None);
        let err = bus
            .send(EventName::SubjectLessonPlans, json!({"subjectId": "maths"}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, LessonflowError::Validation { .. }));
        assert!(transport.events().await.is_empty());
    }

    #[tokio::test]
    async fn accepted_event_carries_payload_and_user() {
        let (bus, transport) = bus_with(None);
        let id = bus
            .send(EventName::SlackNotifyUserBan, json!({}), Some("u1"))
            .await
            .unwrap();

        let events = transport.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, id);
        assert_eq!(events[0].user_id(), Some("u1"));
    }

    #[tokio::test]
    async fn typed_send_uses_wire_field_names() {
        let (bus, transport) = bus_with(None);
        bus.send_typed(
            EventName::SubjectSummarise,
            &SubjectScope {
                subject_id: "maths".into(),
                key_stage_id: "ks2".into(),
            },
            None,
        )
        .await
        .unwrap();
        bus.send_typed(
            EventName::LessonGeneratePlan,
            &LessonRef { lesson_id: "l1".into() },
            None,
        )
        .await
        .unwrap();

        let events = transport.events().await;
        assert_eq!(events[0].data, json!({"subjectId": "maths", "keyStageId": "ks2"}));
        assert_eq!(events[1].data, json!({"lessonId": "l1"}));
    }

    #[tokio::test]
    async fn unknown_raw_name_is_rejected() {
        let (bus, transport) = bus_with(None);
        assert!(bus.send_raw("app/unknown", json!({}), None).await.is_err());
        bus.send_raw("app/stats.recalculate", json!({}), None).await.unwrap();
        assert_eq!(transport.names().await, vec![EventName::StatsRecalculate]);
    }

    #[tokio::test]
    #[traced_test]
    async fn log_line_masks_event_key() {
        let (bus, _transport) = bus_with(Some("evtkey-0123456789abcd"));
        bus.send(EventName::Healthcheck, json!({}), None).await.unwrap();

        assert!(logs_contain("app/healthcheck"));
        assert!(logs_contain("****abcd"));
        assert!(!logs_contain("evtkey-0123456789abcd"));
    }
}
