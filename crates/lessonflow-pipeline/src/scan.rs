// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status-gated batch scanning.
//!
//! A scanner pages through ids whose status equals a gate value and sends
//! one event per id. Pages use keyset pagination on the id, so rows that
//! leave the gate status mid-scan do not shift later pages. No lock is
//! taken: two scans may enqueue the same id, and the handlers re-check
//! status before acting.

use lessonflow_bus::EventName;
use lessonflow_core::LessonflowError;
use lessonflow_storage::Tracked;
use lessonflow_storage::queries::status;
use serde_json::{Map, Value};
use tracing::info;

use crate::context::PipelineContext;
use crate::step::StepContext;

/// `{ "<field>": "<id>" }`.
pub fn id_payload(field: &str, id: &str) -> Value {
    let mut map = Map::new();
    map.insert(field.to_string(), Value::String(id.to_string()));
    Value::Object(map)
}

/// Send `target` with `{field: id}` for every id, as one memoized step.
pub async fn send_for_ids(
    ctx: &PipelineContext,
    step: &StepContext,
    step_name: &str,
    ids: &[String],
    target: EventName,
    field: &str,
) -> Result<usize, LessonflowError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let bus = &ctx.bus;
    step.run(step_name, || async move {
        for id in ids {
            bus.send(target, id_payload(field, id), None).await?;
        }
        Ok(ids.len())
    })
    .await
}

/// Send `target` for every row of `S`'s table currently in `gate`.
///
/// Returns the number of events sent.
pub async fn fan_out_status<S: Tracked>(
    ctx: &PipelineContext,
    step: &StepContext,
    gate: S,
    target: EventName,
    field: &str,
) -> Result<usize, LessonflowError> {
    let page_size = ctx.settings.page_size.max(1);
    let mut after: Option<String> = None;
    let mut sent = 0;

    for page in 0.. {
        let db = &ctx.db;
        let cursor = after.clone();
        let ids: Vec<String> = step
            .run(&format!("page-{page}"), || async move {
                status::ids_with_status(db, gate, cursor.as_deref(), page_size).await
            })
            .await?;

        sent += send_for_ids(ctx, step, &format!("send-page-{page}"), &ids, target, field).await?;

        if ids.len() < page_size as usize {
            break;
        }
        after = ids.last().cloned();
    }

    info!(entity = S::ENTITY, %gate, %target, sent, "scan finished");
    Ok(sent)
}
