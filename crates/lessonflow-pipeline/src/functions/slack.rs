// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator notifications posted through the notifier adapter.

use async_trait::async_trait;
use lessonflow_bus::{Empty, Event, EventName, ModerationNotice, RateLimitNotice};
use lessonflow_core::LessonflowError;
use lessonflow_core::types::Notification;
use serde_json::{Value, json};

use crate::context::PipelineContext;
use crate::function::PipelineFunction;
use crate::step::StepContext;

fn acting_user(event: &Event) -> Result<&str, LessonflowError> {
    event
        .user_id()
        .ok_or_else(|| LessonflowError::non_retriable(format!("{} has no user", event.name)))
}

async fn post(
    ctx: &PipelineContext,
    step: &StepContext,
    text: String,
) -> Result<Value, LessonflowError> {
    let notifier = &ctx.notifier;
    let text_ref = &text;
    step.run("notify", || async move {
        notifier
            .notify(Notification {
                text: text_ref.clone(),
            })
            .await
    })
    .await?;
    Ok(json!({ "text": text }))
}

pub struct NotifyUserBan;

#[async_trait]
impl PipelineFunction for NotifyUserBan {
    fn id(&self) -> &'static str {
        "slack-notify-user-ban"
    }

    fn trigger(&self) -> EventName {
        EventName::SlackNotifyUserBan
    }

    async fn run(
        &self,
        ctx: &PipelineContext,
        step: &StepContext,
        event: &Event,
    ) -> Result<Value, LessonflowError> {
        let Empty {} = event.payload()?;
        let user_id = acting_user(event)?;
        post(
            ctx,
            step,
            format!("User {user_id} has been banned after repeated safety violations"),
        )
        .await
    }
}

pub struct NotifyRateLimit;

#[async_trait]
impl PipelineFunction for NotifyRateLimit {
    fn id(&self) -> &'static str {
        "slack-notify-rate-limit"
    }

    fn trigger(&self) -> EventName {
        EventName::SlackNotifyRateLimit
    }

    async fn run(
        &self,
        ctx: &PipelineContext,
        step: &StepContext,
        event: &Event,
    ) -> Result<Value, LessonflowError> {
        let RateLimitNotice { limit, window } = event.payload()?;
        let user_id = acting_user(event)?;
        post(
            ctx,
            step,
            format!("User {user_id} hit the rate limit of {limit} requests per {window}"),
        )
        .await
    }
}

pub struct NotifyModeration;

#[async_trait]
impl PipelineFunction for NotifyModeration {
    fn id(&self) -> &'static str {
        "slack-notify-moderation"
    }

    fn trigger(&self) -> EventName {
        EventName::SlackNotifyModeration
    }

    async fn run(
        &self,
        ctx: &PipelineContext,
        step: &StepContext,
        event: &Event,
    ) -> Result<Value, LessonflowError> {
        let ModerationNotice {
            thread_id,
            categories,
            justification,
        } = event.payload()?;
        let user_id = acting_user(event)?;
        post(
            ctx,
            step,
            format!(
                "Moderation: user {user_id} in thread {thread_id} flagged for [{}]: {justification}",
                categories.join(", ")
            ),
        )
        .await
    }
}
