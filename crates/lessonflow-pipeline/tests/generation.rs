// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-requested generations: moderation, refusal, reuse, and failure.

use lessonflow_bus::EventName;
use lessonflow_core::{GenerationStatus, LessonflowError};
use lessonflow_pipeline::functions::generation::moderation_type;
use lessonflow_safety::{DetectionSource, RecordType, UserAction};
use lessonflow_storage::Prompt;
use lessonflow_storage::queries::{generations, safety};
use lessonflow_test_utils::{MockReply, TestHarness};
use serde_json::{Value, json};

const APP: &str = "quiz-generator";
const USER: &str = "user-1";

async fn setup(h: &TestHarness, prompt_app: &str) {
    generations::insert_prompt(
        &h.db,
        &Prompt {
            id: "p1".into(),
            app_id: prompt_app.into(),
            slug: "generate-question".into(),
            template: "Write a quiz question about {topic} for {ageRange}.".into(),
        },
    )
    .await
    .unwrap();
}

async fn request(h: &TestHarness, inputs: Value) -> String {
    let generation_id = generations::insert_generation(&h.db, APP, "p1", USER, &inputs)
        .await
        .unwrap();
    h.send(
        EventName::GenerationRequest,
        json!({
            "appId": APP,
            "promptId": "p1",
            "generationId": generation_id,
            "promptInputs": inputs,
        }),
        Some(USER),
    )
    .await
    .unwrap();
    generation_id
}

fn inputs(topic: &str) -> Value {
    json!({ "topic": topic, "ageRange": "11-14" })
}

#[tokio::test]
async fn test_generation_succeeds_with_formatted_prompt() {
    let h = TestHarness::builder()
        .with_completions(vec![MockReply::json(json!({ "question": "What erupts?" }))])
        .build()
        .await
        .unwrap();
    setup(&h, APP).await;

    let id = request(&h, inputs("volcanoes")).await;
    h.drain().await.unwrap();

    let generation = generations::get_generation(&h.db, &id).await.unwrap().unwrap();
    assert_eq!(generation.status, GenerationStatus::Success);
    assert_eq!(generation.response, Some(json!({ "question": "What erupts?" })));
    assert!(generation.prompt_inputs_hash.is_some());

    let requests = h.completion.requests().await;
    assert_eq!(
        requests[0].messages[1].content,
        "Write a quiz question about volcanoes for 11-14."
    );
    // ageRange is excluded from moderation.
    assert_eq!(h.moderation.inputs().await, vec!["\"volcanoes\"".to_string()]);
}

#[tokio::test]
async fn test_generation_request_requires_a_user() {
    let h = TestHarness::new().await.unwrap();
    let err = h
        .send(
            EventName::GenerationRequest,
            json!({
                "appId": APP,
                "promptId": "p1",
                "generationId": "g1",
                "promptInputs": {},
            }),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LessonflowError::Validation { .. }));
}

#[tokio::test]
async fn test_producer_payload_with_stream_flag_is_accepted() {
    let h = TestHarness::builder()
        .with_completions(vec![MockReply::json(json!({ "question": "What erupts?" }))])
        .build()
        .await
        .unwrap();
    setup(&h, APP).await;
    let generation_id = generations::insert_generation(&h.db, APP, "p1", USER, &inputs("volcanoes"))
        .await
        .unwrap();

    let event_id = h
        .send(
            EventName::GenerationRequest,
            json!({
                "appId": APP,
                "promptId": "p1",
                "generationId": generation_id,
                "promptInputs": inputs("volcanoes"),
                "streamCompletion": false,
            }),
            Some(USER),
        )
        .await
        .unwrap();
    let queued = h.event(&event_id).await.unwrap().unwrap();
    assert_eq!(queued.name, "app/generation.requested");
    h.drain().await.unwrap();

    let generation = generations::get_generation(&h.db, &generation_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(generation.status, GenerationStatus::Success);
}

#[tokio::test]
async fn test_moderation_flag_records_a_violation() {
    let h = TestHarness::new().await.unwrap();
    setup(&h, APP).await;
    h.moderation.flag_on("forbidden").await;

    let id = request(&h, inputs("something forbidden")).await;
    h.drain().await.unwrap();

    let generation = generations::get_generation(&h.db, &id).await.unwrap().unwrap();
    assert_eq!(generation.status, GenerationStatus::Flagged);
    assert_eq!(
        generation.moderation_type.as_deref(),
        Some(moderation_type::OPENAI_FLAGGED)
    );
    assert_eq!(h.completion.call_count().await, 0);

    let violations = safety::list_for_user(&h.db, USER).await.unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].record_id, id);
    assert_eq!(violations[0].record_type, "GENERATION");
    assert_eq!(violations[0].detection_source, "OPENAI");
    assert_eq!(violations[0].user_action, "QUIZ_GENERATION");
}

#[tokio::test]
async fn test_repeated_flags_ban_the_user() {
    let h = TestHarness::new().await.unwrap();
    setup(&h, APP).await;
    h.moderation.flag_on("forbidden").await;

    for i in 0..6 {
        request(&h, inputs(&format!("forbidden {i}"))).await;
    }
    h.drain().await.unwrap();

    assert_eq!(h.identity.ban_calls().await, vec![USER.to_string()]);
    let sent = h.notifier.sent().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains(USER));
}

#[tokio::test]
async fn test_failed_ban_is_retried_without_a_second_violation() {
    let h = TestHarness::new().await.unwrap();
    setup(&h, APP).await;
    h.moderation.flag_on("forbidden").await;
    for i in 0..5 {
        h.safety
            .record_violation(
                USER,
                UserAction::QuizGeneration,
                DetectionSource::OpenAi,
                RecordType::Generation,
                &format!("earlier-{i}"),
            )
            .await
            .unwrap();
    }
    h.identity.fail_bans(1).await;

    let id = request(&h, inputs("forbidden again")).await;
    h.drain().await.unwrap();

    let violations = safety::list_for_user(&h.db, USER).await.unwrap();
    assert_eq!(violations.len(), 6);
    assert_eq!(violations.iter().filter(|v| v.record_id == id).count(), 1);
    assert_eq!(h.identity.ban_calls().await, vec![USER.to_string()]);
    assert_eq!(h.notifier.sent().await.len(), 1);

    let generation = generations::get_generation(&h.db, &id).await.unwrap().unwrap();
    assert_eq!(generation.status, GenerationStatus::Flagged);
}

#[tokio::test]
async fn test_over_threshold_flags_without_violation() {
    let h = TestHarness::new().await.unwrap();
    setup(&h, APP).await;
    h.moderation.over_threshold_on("edgy").await;

    let id = request(&h, inputs("an edgy topic")).await;
    h.drain().await.unwrap();

    let generation = generations::get_generation(&h.db, &id).await.unwrap().unwrap();
    assert_eq!(generation.status, GenerationStatus::Flagged);
    assert_eq!(
        generation.moderation_type.as_deref(),
        Some(moderation_type::OPENAI_OVER_THRESHOLD)
    );
    assert!(safety::list_for_user(&h.db, USER).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_clean_moderation_results_are_kept() {
    let h = TestHarness::builder()
        .with_completions(vec![MockReply::json(json!({ "question": "What erupts?" }))])
        .build()
        .await
        .unwrap();
    setup(&h, APP).await;

    let id = request(&h, inputs("volcanoes")).await;
    h.drain().await.unwrap();

    let generation = generations::get_generation(&h.db, &id).await.unwrap().unwrap();
    assert_eq!(generation.status, GenerationStatus::Success);
    assert!(generation.moderation_type.is_none());
    let meta = generation.moderation_meta.expect("moderation results stored");
    assert_eq!(meta["moderationResults"]["flagged"], json!(false));
}

#[tokio::test]
async fn test_moderation_can_be_disabled() {
    let h = TestHarness::builder()
        .with_moderation(false)
        .build()
        .await
        .unwrap();
    setup(&h, APP).await;
    h.moderation.flag_on("forbidden").await;

    let id = request(&h, inputs("forbidden")).await;
    h.drain().await.unwrap();

    let generation = generations::get_generation(&h.db, &id).await.unwrap().unwrap();
    assert_eq!(generation.status, GenerationStatus::Success);
    assert!(h.moderation.inputs().await.is_empty());
}

#[tokio::test]
async fn test_model_refusal_flags_generation() {
    let h = TestHarness::builder()
        .with_completions(vec![MockReply::Refusal("I can't help with that.".into())])
        .build()
        .await
        .unwrap();
    setup(&h, APP).await;

    let id = request(&h, inputs("volcanoes")).await;
    h.drain().await.unwrap();

    let generation = generations::get_generation(&h.db, &id).await.unwrap().unwrap();
    assert_eq!(generation.status, GenerationStatus::Flagged);
    assert_eq!(
        generation.moderation_type.as_deref(),
        Some(moderation_type::LLM_REFUSAL)
    );
    assert_eq!(generation.error.as_deref(), Some("I can't help with that."));
    assert!(safety::list_for_user(&h.db, USER).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_identical_inputs_reuse_prior_response_with_playback() {
    let h = TestHarness::builder()
        .with_completions(vec![MockReply::json(json!({ "question": "first" }))])
        .with_prompt_playback(true)
        .build()
        .await
        .unwrap();
    setup(&h, APP).await;

    let first = request(&h, inputs("volcanoes")).await;
    h.drain().await.unwrap();
    let second = request(&h, inputs("volcanoes")).await;
    h.drain().await.unwrap();

    assert_eq!(h.completion.call_count().await, 1);
    let a = generations::get_generation(&h.db, &first).await.unwrap().unwrap();
    let b = generations::get_generation(&h.db, &second).await.unwrap().unwrap();
    assert_eq!(b.status, GenerationStatus::Success);
    assert_eq!(a.response, b.response);
    assert_eq!(a.prompt_inputs_hash, b.prompt_inputs_hash);
}

#[tokio::test]
async fn test_identical_inputs_call_the_model_again_by_default() {
    let h = TestHarness::builder()
        .with_completions(vec![
            MockReply::json(json!({ "question": "first" })),
            MockReply::json(json!({ "question": "second" })),
        ])
        .build()
        .await
        .unwrap();
    setup(&h, APP).await;

    let first = request(&h, inputs("volcanoes")).await;
    h.drain().await.unwrap();
    let second = request(&h, inputs("volcanoes")).await;
    h.drain().await.unwrap();

    assert_eq!(h.completion.call_count().await, 2);
    let a = generations::get_generation(&h.db, &first).await.unwrap().unwrap();
    let b = generations::get_generation(&h.db, &second).await.unwrap().unwrap();
    assert_eq!(a.response, Some(json!({ "question": "first" })));
    assert_eq!(b.response, Some(json!({ "question": "second" })));
}

#[tokio::test]
async fn test_duplicate_request_leaves_generation_untouched() {
    let h = TestHarness::builder()
        .with_completions(vec![MockReply::json(json!({ "question": "q" }))])
        .build()
        .await
        .unwrap();
    setup(&h, APP).await;

    let id = request(&h, inputs("volcanoes")).await;
    let duplicate = h
        .send(
            EventName::GenerationRequest,
            json!({
                "appId": APP,
                "promptId": "p1",
                "generationId": id,
                "promptInputs": inputs("volcanoes"),
            }),
            Some(USER),
        )
        .await
        .unwrap();
    h.drain().await.unwrap();

    let generation = generations::get_generation(&h.db, &id).await.unwrap().unwrap();
    assert_eq!(generation.status, GenerationStatus::Success);
    assert_eq!(h.event(&duplicate).await.unwrap().unwrap().status, "failed");
    assert_eq!(h.completion.call_count().await, 1);
}

#[tokio::test]
async fn test_prompt_from_another_app_fails_generation() {
    let h = TestHarness::new().await.unwrap();
    setup(&h, "another-app").await;

    let id = request(&h, inputs("volcanoes")).await;
    h.drain().await.unwrap();

    let generation = generations::get_generation(&h.db, &id).await.unwrap().unwrap();
    assert_eq!(generation.status, GenerationStatus::Failed);
    assert_eq!(generation.error.as_deref(), Some("Prompt does not exist"));
}

#[tokio::test]
async fn test_provider_outage_fails_generation_after_retries() {
    let h = TestHarness::builder()
        .with_completions(vec![
            MockReply::Error("upstream 503".into()),
            MockReply::Error("upstream 503".into()),
            MockReply::Error("upstream 503".into()),
        ])
        .build()
        .await
        .unwrap();
    setup(&h, APP).await;

    let id = request(&h, inputs("volcanoes")).await;
    h.drain().await.unwrap();

    assert_eq!(h.completion.call_count().await, 3);
    let generation = generations::get_generation(&h.db, &id).await.unwrap().unwrap();
    assert_eq!(generation.status, GenerationStatus::Failed);
    assert_eq!(generation.error.as_deref(), Some("upstream 503"));
}
