// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Violation counting, banning, and unbanning against mock identity and
//! analytics providers.

use chrono::Duration;
use lessonflow_bus::EventName;
use lessonflow_safety::{DetectionSource, RecordType, UserAction, ViolationOutcome};
use lessonflow_storage::queries::safety;
use lessonflow_test_utils::TestHarness;

async fn violate(h: &TestHarness, user: &str, record_id: &str) -> ViolationOutcome {
    h.safety
        .record_violation(
            user,
            UserAction::QuizGeneration,
            DetectionSource::OpenAi,
            RecordType::Generation,
            record_id,
        )
        .await
        .unwrap()
}

async fn violate_times(h: &TestHarness, user: &str, n: usize) -> Vec<ViolationOutcome> {
    let mut outcomes = Vec::new();
    for i in 0..n {
        outcomes.push(violate(h, user, &format!("gen-{i}")).await);
    }
    outcomes
}

#[tokio::test]
async fn sixth_violation_in_window_bans_once() {
    let h = TestHarness::new().await.unwrap();

    let outcomes = violate_times(&h, "user-1", 6).await;
    assert_eq!(&outcomes[..5], &[ViolationOutcome::Recorded; 5]);
    assert_eq!(outcomes[5], ViolationOutcome::Banned);
    assert_eq!(h.identity.ban_calls().await, vec!["user-1".to_string()]);

    // Seventh: still over, but the provider already says banned.
    assert_eq!(
        violate(&h, "user-1", "gen-7").await,
        ViolationOutcome::AlreadyBanned
    );
    assert_eq!(h.identity.ban_calls().await.len(), 1);
}

#[tokio::test]
async fn ban_is_reported_to_analytics_and_queued_for_slack() {
    let h = TestHarness::new().await.unwrap();
    violate_times(&h, "user-1", 6).await;

    let names = h.analytics.event_names().await;
    assert_eq!(names.iter().filter(|n| *n == "Safety Violation").count(), 6);
    assert!(names.contains(&"User Banned".to_string()));
    assert_eq!(
        h.analytics.identifies().await,
        vec![("user-1".to_string(), serde_json::json!({ "banned": true }))]
    );
    assert_eq!(h.analytics.flush_count().await, 1);

    let queued = h.events_named(EventName::SlackNotifyUserBan).await.unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].user_id.as_deref(), Some("user-1"));

    h.drain().await.unwrap();
    let sent = h.notifier.sent().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("user-1"));
}

#[tokio::test]
async fn violations_outside_window_do_not_count() {
    let h = TestHarness::new().await.unwrap();
    violate_times(&h, "user-1", 5).await;

    h.clock.advance(Duration::days(31));
    assert_eq!(
        violate(&h, "user-1", "late").await,
        ViolationOutcome::Recorded
    );
    assert!(h.identity.ban_calls().await.is_empty());
    assert!(!h.safety.is_over_threshold("user-1").await.unwrap());
}

#[tokio::test]
async fn first_violation_ages_out_before_the_sixth() {
    let h = TestHarness::new().await.unwrap();
    violate(&h, "user-1", "gen-0").await;
    h.clock.advance(Duration::days(1));
    for i in 1..5 {
        violate(&h, "user-1", &format!("gen-{i}")).await;
    }

    h.clock.advance(Duration::days(30));
    assert_eq!(
        violate(&h, "user-1", "gen-5").await,
        ViolationOutcome::Recorded
    );
    assert!(h.identity.ban_calls().await.is_empty());
}

#[tokio::test]
async fn counts_are_per_user() {
    let h = TestHarness::new().await.unwrap();
    violate_times(&h, "user-1", 5).await;
    violate_times(&h, "user-2", 5).await;
    assert!(!h.safety.is_over_threshold("user-1").await.unwrap());
    assert!(h.identity.ban_calls().await.is_empty());
}

#[tokio::test]
async fn safety_testers_are_never_banned() {
    let h = TestHarness::new().await.unwrap();
    let flag = h.safety.policy().tester_flag.clone();
    h.analytics.enable_flag(&flag, "tester").await;

    let outcomes = violate_times(&h, "tester", 7).await;
    assert_eq!(outcomes[5], ViolationOutcome::TesterExempt);
    assert_eq!(outcomes[6], ViolationOutcome::TesterExempt);
    assert!(h.identity.ban_calls().await.is_empty());
    assert!(!h.identity.is_banned("tester").await);
}

#[tokio::test]
async fn removing_a_violation_unbans_when_back_under_threshold() {
    let h = TestHarness::new().await.unwrap();
    violate_times(&h, "user-1", 6).await;
    assert!(h.identity.is_banned("user-1").await);

    let violations = safety::list_for_user(&h.db, "user-1").await.unwrap();
    assert_eq!(violations.len(), 6);
    h.safety
        .remove_violation_by_id(&violations[0].id)
        .await
        .unwrap();

    assert!(!h.identity.is_banned("user-1").await);
    assert_eq!(h.identity.unban_calls().await, vec!["user-1".to_string()]);
    assert!(
        h.analytics
            .event_names()
            .await
            .contains(&"User Unbanned".to_string())
    );
}

#[tokio::test]
async fn removing_by_record_unbans_every_affected_user() {
    let h = TestHarness::new().await.unwrap();
    for user in ["user-1", "user-2"] {
        violate(&h, user, "shared-record").await;
        for i in 0..5 {
            violate(&h, user, &format!("{user}-{i}")).await;
        }
        assert!(h.identity.is_banned(user).await);
    }

    h.safety
        .remove_violations_by_record_id("shared-record")
        .await
        .unwrap();
    assert!(!h.identity.is_banned("user-1").await);
    assert!(!h.identity.is_banned("user-2").await);
    assert_eq!(h.identity.unban_calls().await.len(), 2);
}

#[tokio::test]
async fn unban_is_skipped_while_still_over_threshold() {
    let h = TestHarness::new().await.unwrap();
    violate_times(&h, "user-1", 7).await;

    let violations = safety::list_for_user(&h.db, "user-1").await.unwrap();
    h.safety
        .remove_violation_by_id(&violations[0].id)
        .await
        .unwrap();
    assert!(h.identity.is_banned("user-1").await);
    assert!(h.identity.unban_calls().await.is_empty());
}

#[tokio::test]
async fn unban_of_user_who_is_not_banned_is_a_no_op() {
    let h = TestHarness::new().await.unwrap();
    violate_times(&h, "user-1", 2).await;
    h.safety.conditionally_unban_user("user-1").await.unwrap();
    assert!(h.identity.unban_calls().await.is_empty());

    h.safety.remove_violation_by_id("missing").await.unwrap();
}

#[tokio::test]
async fn ban_state_lives_at_the_identity_provider() {
    let h = TestHarness::new().await.unwrap();
    // Banned out of band: the counter trusts the provider.
    h.identity.set_banned("user-1", true).await;
    let outcomes = violate_times(&h, "user-1", 6).await;
    assert_eq!(outcomes[5], ViolationOutcome::AlreadyBanned);
    assert!(h.identity.ban_calls().await.is_empty());
}

#[tokio::test]
async fn recording_the_same_record_twice_counts_once() {
    let h = TestHarness::new().await.unwrap();
    violate_times(&h, "user-1", 5).await;
    assert_eq!(
        violate(&h, "user-1", "gen-4").await,
        ViolationOutcome::Recorded
    );

    assert_eq!(safety::list_for_user(&h.db, "user-1").await.unwrap().len(), 5);
    let names = h.analytics.event_names().await;
    assert_eq!(names.iter().filter(|n| *n == "Safety Violation").count(), 5);
    assert!(h.identity.ban_calls().await.is_empty());
}

#[tokio::test]
async fn enforce_retries_a_ban_that_failed() {
    let h = TestHarness::new().await.unwrap();
    violate_times(&h, "user-1", 5).await;
    h.identity.fail_bans(1).await;

    let err = h
        .safety
        .record_violation(
            "user-1",
            UserAction::QuizGeneration,
            DetectionSource::OpenAi,
            RecordType::Generation,
            "gen-5",
        )
        .await
        .unwrap_err();
    assert!(err.is_retriable());
    assert!(h.identity.ban_calls().await.is_empty());

    assert_eq!(
        h.safety.enforce("user-1").await.unwrap(),
        ViolationOutcome::Banned
    );
    assert_eq!(h.identity.ban_calls().await, vec!["user-1".to_string()]);
    assert_eq!(safety::list_for_user(&h.db, "user-1").await.unwrap().len(), 6);
}
