// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Lessonflow integration tests.
//!
//! Provides mock adapters and a harness for fast, deterministic,
//! CI-runnable tests without OpenAI, Clerk, PostHog, or Slack.
//!
//! # Components
//!
//! - [`MockCompletion`] - Completion model with queued replies
//! - [`MockEmbedder`] - Deterministic embedding vectors with call counting
//! - [`MockModeration`] - Moderation that flags inputs containing chosen words
//! - [`MockIdentity`] - In-memory ban flags
//! - [`MockAnalytics`] - Captured events, person properties, and feature flags
//! - [`MockNotifier`] - Captured team-channel notifications
//! - [`TestHarness`] - Temp database, queue-backed bus, and a worker wired to the mocks

pub mod harness;
pub mod mock_provider;
pub mod mock_services;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_provider::{MockCompletion, MockEmbedder, MockModeration, MockReply};
pub use mock_services::{MockAnalytics, MockIdentity, MockNotifier};
