// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the content pipeline.
//!
//! Each test creates an isolated TestHarness with temp SQLite and mock
//! adapters, sends one event, and drains the queue including every event the
//! functions fan out.

use std::time::Duration;

use lessonflow_bus::EventName;
use lessonflow_core::{
    LessonPlanPartStatus, LessonPlanStatus, LessonSummaryStatus, LessonflowError,
    QuizAnswerStatus, QuizQuestionStatus, SnippetStatus, TranscriptStatus,
};
use lessonflow_pipeline::Settlement;
use lessonflow_storage::queries::{
    lesson_plans, quizzes, snippets, stats, status, steps, summaries, transcripts,
};
use lessonflow_test_utils::{MockReply, TestHarness};
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn long_transcript(words: usize) -> String {
    (0..words)
        .map(|i| format!("word{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn plan_reply() -> MockReply {
    MockReply::json(json!({
        "title": "Adding fractions",
        "subject": "maths",
        "keyStage": "ks3",
        "topic": "Fractions",
        "learningOutcome": "I can add fractions with different denominators.",
        "keywords": [
            { "keyword": "numerator", "definition": "the top number" },
            { "keyword": "denominator", "definition": "the bottom number" },
        ],
        "misconceptions": [],
    }))
}

fn summary_reply() -> MockReply {
    MockReply::json(json!({
        "summary": "Pupils learn to add fractions.",
        "topics": ["fractions"],
        "learningObjectives": ["add fractions"],
        "concepts": ["common denominator"],
        "keywords": ["numerator", "denominator"],
    }))
}

// ---- Test 1: Validation before dispatch ----

#[tokio::test]
async fn test_missing_field_is_rejected_before_any_handler_runs() {
    let h = TestHarness::new().await.unwrap();

    let err = h
        .send(EventName::LessonSummarise, json!({}), None)
        .await
        .unwrap_err();
    assert!(matches!(err, LessonflowError::Validation { .. }));

    let err = h
        .send(EventName::TranscriptEmbed, json!({ "transcriptId": "" }), None)
        .await
        .unwrap_err();
    assert!(matches!(err, LessonflowError::Validation { .. }));

    assert!(h.events_named(EventName::LessonSummarise).await.unwrap().is_empty());
    assert_eq!(h.drain().await.unwrap(), 0);
    assert_eq!(h.completion.call_count().await, 0);
}

#[tokio::test]
async fn test_healthcheck_completes() {
    let h = TestHarness::new().await.unwrap();
    let id = h.send(EventName::Healthcheck, json!({}), None).await.unwrap();
    assert_eq!(
        h.worker.process_next().await.unwrap(),
        Some(Settlement::Completed)
    );
    assert_eq!(h.event(&id).await.unwrap().unwrap().status, "completed");
}

// ---- Test 2: Transcript split and snippet embedding ----

#[tokio::test]
async fn test_transcript_embed_splits_and_embeds_every_snippet() {
    let h = TestHarness::new().await.unwrap();
    h.add_lesson("l1", "maths", "ks3").await.unwrap();
    let transcript_id = transcripts::insert_transcript(&h.db, "l1", &long_transcript(300))
        .await
        .unwrap();

    h.run(
        EventName::TranscriptEmbed,
        json!({ "transcriptId": transcript_id }),
        None,
    )
    .await
    .unwrap();

    assert_eq!(
        status::get_status::<TranscriptStatus>(&h.db, &transcript_id)
            .await
            .unwrap(),
        Some(TranscriptStatus::Success)
    );
    let snippet_ids = snippets::snippet_ids_for_transcript(&h.db, &transcript_id)
        .await
        .unwrap();
    assert!(snippet_ids.len() > 1);
    for id in &snippet_ids {
        assert_eq!(
            status::get_status::<SnippetStatus>(&h.db, id).await.unwrap(),
            Some(SnippetStatus::Success)
        );
        assert!(status::has_embedding::<SnippetStatus>(&h.db, id).await.unwrap());
    }
    assert_eq!(h.embedder.call_count().await, snippet_ids.len());
}

#[tokio::test]
async fn test_embedding_twice_is_a_no_op() {
    let h = TestHarness::new().await.unwrap();
    h.add_lesson("l1", "maths", "ks3").await.unwrap();
    let transcript_id = transcripts::insert_transcript(&h.db, "l1", &long_transcript(40))
        .await
        .unwrap();
    h.run(
        EventName::TranscriptEmbed,
        json!({ "transcriptId": transcript_id }),
        None,
    )
    .await
    .unwrap();
    let calls = h.embedder.call_count().await;
    let snippet_ids = snippets::snippet_ids_for_transcript(&h.db, &transcript_id)
        .await
        .unwrap();

    h.run(
        EventName::SnippetEmbed,
        json!({ "snippetId": snippet_ids[0] }),
        None,
    )
    .await
    .unwrap();
    h.run(
        EventName::TranscriptEmbed,
        json!({ "transcriptId": transcript_id }),
        None,
    )
    .await
    .unwrap();

    assert_eq!(h.embedder.call_count().await, calls);
    assert_eq!(
        snippets::snippet_ids_for_transcript(&h.db, &transcript_id)
            .await
            .unwrap(),
        snippet_ids
    );
}

#[tokio::test]
async fn test_failed_embedding_is_retried_then_marked_failed() {
    let h = TestHarness::builder()
        .with_max_attempts(2)
        .build()
        .await
        .unwrap();
    h.add_lesson("l1", "maths", "ks3").await.unwrap();
    let question_id = quizzes::insert_question(&h.db, "l1", "What is 1/2 + 1/4?")
        .await
        .unwrap();
    h.embedder.fail_times(5).await;

    let event_id = h
        .run(
            EventName::QuizQuestionEmbed,
            json!({ "quizQuestionId": question_id }),
            None,
        )
        .await
        .unwrap();

    let record = h.event(&event_id).await.unwrap().unwrap();
    assert_eq!(record.status, "failed");
    assert_eq!(record.attempts, 2);
    assert_eq!(
        status::get_status::<QuizQuestionStatus>(&h.db, &question_id)
            .await
            .unwrap(),
        Some(QuizQuestionStatus::Failed)
    );
}

// ---- Test 3: Table scanners ----

#[tokio::test]
async fn test_scan_pending_then_process_leaves_terminal_status() {
    let h = TestHarness::builder()
        .with_page_size(2)
        .build()
        .await
        .unwrap();
    h.add_lesson("l1", "maths", "ks3").await.unwrap();
    let mut answer_ids = Vec::new();
    for i in 0..5 {
        let q = quizzes::insert_question(&h.db, "l1", &format!("question {i}"))
            .await
            .unwrap();
        answer_ids.push(quizzes::insert_answer(&h.db, &q, &format!("answer {i}")).await.unwrap());
    }

    h.run(EventName::QuizAnswerEmbedAll, json!({}), None)
        .await
        .unwrap();

    assert_eq!(
        h.events_named(EventName::QuizAnswerEmbed).await.unwrap().len(),
        5
    );
    for id in &answer_ids {
        assert_eq!(
            status::get_status::<QuizAnswerStatus>(&h.db, id).await.unwrap(),
            Some(QuizAnswerStatus::Success)
        );
    }

    // Nothing is pending any more, so a second scan sends nothing.
    h.run(EventName::QuizAnswerEmbedAll, json!({}), None)
        .await
        .unwrap();
    assert_eq!(
        h.events_named(EventName::QuizAnswerEmbed).await.unwrap().len(),
        5
    );
}

#[tokio::test]
async fn test_lesson_quiz_embed_covers_questions_and_answers() {
    let h = TestHarness::new().await.unwrap();
    h.add_lesson("l1", "maths", "ks3").await.unwrap();
    let q = quizzes::insert_question(&h.db, "l1", "What is a numerator?")
        .await
        .unwrap();
    let a = quizzes::insert_answer(&h.db, &q, "The top number").await.unwrap();

    h.run(
        EventName::SubjectQuizzesEmbed,
        json!({ "subjectId": "maths", "keyStageId": "ks3" }),
        None,
    )
    .await
    .unwrap();

    assert_eq!(
        status::get_status::<QuizQuestionStatus>(&h.db, &q).await.unwrap(),
        Some(QuizQuestionStatus::Success)
    );
    assert_eq!(
        status::get_status::<QuizAnswerStatus>(&h.db, &a).await.unwrap(),
        Some(QuizAnswerStatus::Success)
    );
}

#[tokio::test]
async fn test_question_snippets_are_created_once_and_embedded() {
    let h = TestHarness::builder()
        .with_page_size(2)
        .build()
        .await
        .unwrap();
    h.add_lesson("l1", "maths", "ks3").await.unwrap();
    let mut answered = Vec::new();
    for i in 0..3 {
        let q = quizzes::insert_question(&h.db, "l1", &format!("What is {i} + {i}?"))
            .await
            .unwrap();
        quizzes::insert_distractor(&h.db, &q, "seven").await.unwrap();
        quizzes::insert_answer(&h.db, &q, &format!("{}", i * 2)).await.unwrap();
        answered.push(q);
    }
    let unanswered = quizzes::insert_question(&h.db, "l1", "Who knows?")
        .await
        .unwrap();
    quizzes::insert_distractor(&h.db, &unanswered, "nobody").await.unwrap();

    h.run(EventName::SnippetGenerateForAllQuestions, json!({}), None)
        .await
        .unwrap();

    let embeds = h.events_named(EventName::SnippetEmbed).await.unwrap();
    assert_eq!(embeds.len(), 3);
    for record in &embeds {
        let payload: serde_json::Value = serde_json::from_str(&record.payload).unwrap();
        let id = payload["snippetId"].as_str().unwrap();
        let snippet = snippets::get_snippet(&h.db, id).await.unwrap().unwrap();
        assert_eq!(snippet.status, SnippetStatus::Success);
        assert_eq!(snippet.variant, "QUESTION_AND_ANSWER");
        let question = snippet.question_id.unwrap();
        assert!(answered.contains(&question));
        assert!(snippet.content.starts_with("Question: What is"));
        assert!(snippet.content.contains("Correct Answer:"));
        assert!(!snippet.content.contains("seven"));
    }
    assert_eq!(
        snippets::question_ids_without_snippet(&h.db, None, 10)
            .await
            .unwrap(),
        vec![unanswered.clone()]
    );

    // A second run finds nothing new to create.
    h.run(EventName::SnippetGenerateForAllQuestions, json!({}), None)
        .await
        .unwrap();
    assert_eq!(
        h.events_named(EventName::SnippetEmbed).await.unwrap().len(),
        3
    );
}

#[tokio::test]
async fn test_producer_only_events_are_acknowledged() {
    let h = TestHarness::new().await.unwrap();
    for name in [
        EventName::QuizQuestionGenerateAll,
        EventName::QuizAnswerGenerateAll,
        EventName::DemoPopulateStatuses,
    ] {
        let id = h.run(name, json!({}), None).await.unwrap();
        assert_eq!(h.event(&id).await.unwrap().unwrap().status, "completed");
    }
}

// ---- Test 4: Summaries ----

#[tokio::test]
async fn test_lesson_summarise_generates_then_embeds() {
    let h = TestHarness::builder()
        .with_completions(vec![summary_reply()])
        .build()
        .await
        .unwrap();
    h.add_lesson("l1", "maths", "ks3").await.unwrap();
    transcripts::insert_transcript(&h.db, "l1", "Today we add fractions.")
        .await
        .unwrap();

    h.run(EventName::LessonSummarise, json!({ "lessonId": "l1" }), None)
        .await
        .unwrap();

    let summary = summaries::first_summary_for_lesson(&h.db, "l1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(summary.status, LessonSummaryStatus::Success);
    assert_eq!(summary.content.keywords, vec!["numerator", "denominator"]);
    let requests = h.completion.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].temperature, Some(0.0));
    assert!(requests[0].messages[0].content.contains("Today we add fractions."));

    // Already summarised.
    h.run(EventName::LessonSummarise, json!({ "lessonId": "l1" }), None)
        .await
        .unwrap();
    assert_eq!(h.completion.call_count().await, 1);
}

#[tokio::test]
async fn test_declined_summary_stores_nothing() {
    let h = TestHarness::builder()
        .with_completions(vec![MockReply::json(
            json!({ "errorMessage": "transcript too short" }),
        )])
        .build()
        .await
        .unwrap();
    h.add_lesson("l1", "maths", "ks3").await.unwrap();
    transcripts::insert_transcript(&h.db, "l1", "Hi.").await.unwrap();

    let id = h
        .run(EventName::LessonSummarise, json!({ "lessonId": "l1" }), None)
        .await
        .unwrap();
    assert_eq!(h.event(&id).await.unwrap().unwrap().status, "completed");
    assert!(
        summaries::first_summary_for_lesson(&h.db, "l1")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_summarise_all_pages_through_every_lesson() {
    let h = TestHarness::builder()
        .with_page_size(2)
        .build()
        .await
        .unwrap();
    for id in ["l1", "l2", "l3"] {
        h.add_lesson(id, "maths", "ks3").await.unwrap();
    }

    h.run(
        EventName::LessonSummariseAll,
        json!({ "newLessonsOnly": true }),
        None,
    )
    .await
    .unwrap();

    // No transcripts, so each request is a completed no-op.
    let sent = h.events_named(EventName::LessonSummarise).await.unwrap();
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|e| e.status == "completed"));
    assert_eq!(h.completion.call_count().await, 0);
}

// ---- Test 5: Lesson plans ----

#[tokio::test]
async fn test_subject_lesson_plans_fans_out_to_every_lesson_without_a_plan() {
    let h = TestHarness::builder()
        .with_completions(vec![plan_reply(), plan_reply()])
        .build()
        .await
        .unwrap();
    for id in ["l1", "l2", "l3"] {
        h.add_lesson(id, "maths", "ks3").await.unwrap();
    }
    h.add_lesson("other", "science", "ks3").await.unwrap();
    let existing = lesson_plans::create_plan(&h.db, "l3", "maths", "ks3")
        .await
        .unwrap();

    h.run(
        EventName::SubjectLessonPlans,
        json!({ "subjectId": "maths", "keyStageId": "ks3" }),
        None,
    )
    .await
    .unwrap();

    assert_eq!(
        h.events_named(EventName::LessonGeneratePlan)
            .await
            .unwrap()
            .len(),
        2
    );
    for lesson in ["l1", "l2"] {
        let plan = lesson_plans::plan_for_lesson(&h.db, lesson)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(plan.status, LessonPlanStatus::Success);
        let parts = lesson_plans::parts_for_plan(&h.db, &plan.id).await.unwrap();
        let mut keys: Vec<_> = parts.iter().map(|p| p.key.as_str()).collect();
        keys.sort();
        assert_eq!(keys, vec!["keywords", "learningOutcome", "title", "topic"]);
        assert!(parts.iter().all(|p| p.status == LessonPlanPartStatus::Success));
    }
    assert!(
        lesson_plans::plan_for_lesson(&h.db, "other")
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(
        status::get_status::<LessonPlanStatus>(&h.db, &existing)
            .await
            .unwrap(),
        Some(LessonPlanStatus::Pending)
    );
}

#[tokio::test]
async fn test_refused_plan_is_failed() {
    let h = TestHarness::builder()
        .with_completions(vec![MockReply::Refusal("cannot help".into())])
        .build()
        .await
        .unwrap();
    h.add_lesson("l1", "maths", "ks3").await.unwrap();

    h.run(EventName::LessonGeneratePlan, json!({ "lessonId": "l1" }), None)
        .await
        .unwrap();

    let plan = lesson_plans::plan_for_lesson(&h.db, "l1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(plan.status, LessonPlanStatus::Failed);
    assert!(h.events_named(EventName::LessonPlanEmbed).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_retry_replays_completed_steps() {
    let h = TestHarness::builder()
        .with_completions(vec![plan_reply()])
        .build()
        .await
        .unwrap();
    h.add_lesson("l1", "maths", "ks3").await.unwrap();
    h.embedder.fail_times(1).await;

    h.run(EventName::LessonGeneratePlan, json!({ "lessonId": "l1" }), None)
        .await
        .unwrap();

    // The model is asked once even though the invocation ran twice.
    assert_eq!(h.completion.call_count().await, 1);
    let plan = lesson_plans::plan_for_lesson(&h.db, "l1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(plan.status, LessonPlanStatus::Success);

    let process = h.events_named(EventName::LessonPlanProcess).await.unwrap();
    assert_eq!(process.len(), 1);
    assert_eq!(process[0].status, "completed");
    assert_eq!(process[0].attempts, 1);
    let completed = steps::completed_steps(&h.db, &process[0].id).await.unwrap();
    assert_eq!(
        completed.iter().filter(|s| s.as_str() == "generate").count(),
        1
    );
    assert_eq!(h.events_named(EventName::LessonPlanEmbed).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_generate_all_and_embed_all_parts_scanners() {
    let h = TestHarness::builder()
        .with_completions(vec![plan_reply()])
        .build()
        .await
        .unwrap();
    h.add_lesson("l1", "maths", "ks3").await.unwrap();
    let plan_id = lesson_plans::create_plan(&h.db, "l1", "maths", "ks3")
        .await
        .unwrap();

    h.run(EventName::LessonPlanGenerateAll, json!({}), None)
        .await
        .unwrap();
    assert_eq!(
        status::get_status::<LessonPlanStatus>(&h.db, &plan_id)
            .await
            .unwrap(),
        Some(LessonPlanStatus::Success)
    );

    // Every part was embedded inline, so the parts scanner finds nothing.
    h.run(EventName::LessonPlanEmbedAllParts, json!({}), None)
        .await
        .unwrap();
    assert!(
        h.events_named(EventName::LessonPlanEmbedPart)
            .await
            .unwrap()
            .is_empty()
    );
}

// ---- Test 6: Statistics ----

#[tokio::test]
async fn test_stats_recalculate_counts_by_status() {
    let h = TestHarness::new().await.unwrap();
    h.add_lesson("l1", "maths", "ks3").await.unwrap();
    let transcript_id = transcripts::insert_transcript(&h.db, "l1", &long_transcript(20))
        .await
        .unwrap();
    quizzes::insert_question(&h.db, "l1", "Pending question").await.unwrap();
    h.run(
        EventName::TranscriptEmbed,
        json!({ "transcriptId": transcript_id }),
        None,
    )
    .await
    .unwrap();

    h.run(EventName::StatsRecalculate, json!({}), None)
        .await
        .unwrap();

    let values = stats::get_statistics(&h.db).await.unwrap();
    let get = |name: &str| values.iter().find(|(n, _)| n == name).map(|(_, c)| *c);
    assert_eq!(get("transcript.SUCCESS"), Some(1));
    assert_eq!(get("snippet.SUCCESS"), Some(1));
    assert_eq!(get("quizQuestion.PENDING"), Some(1));
}

// ---- Test 7: Worker loop ----

#[tokio::test]
async fn test_worker_run_processes_until_cancelled() {
    let h = TestHarness::new().await.unwrap();
    let id = h.send(EventName::Healthcheck, json!({}), None).await.unwrap();

    let cancel = CancellationToken::new();
    let worker = h.worker.clone();
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { worker.run(cancel).await }
    });

    let mut done = false;
    for _ in 0..200 {
        if h.event(&id).await.unwrap().unwrap().status == "completed" {
            done = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cancel.cancel();
    handle.await.unwrap().unwrap();
    assert!(done);
}
