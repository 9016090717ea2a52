// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for external collaborators.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod analytics;
pub mod completion;
pub mod embedding;
pub mod identity;
pub mod moderation;
pub mod notifier;

pub use adapter::PluginAdapter;
pub use analytics::AnalyticsAdapter;
pub use completion::CompletionAdapter;
pub use embedding::EmbeddingAdapter;
pub use identity::IdentityAdapter;
pub use moderation::ModerationAdapter;
pub use notifier::NotifierAdapter;
