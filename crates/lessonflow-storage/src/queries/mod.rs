// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per table family.

pub mod embedding_cache;
pub mod events;
pub mod generations;
pub mod lesson_plans;
pub mod lessons;
pub mod quizzes;
pub mod safety;
pub mod snippets;
pub mod stats;
pub mod status;
pub mod steps;
pub mod summaries;
pub mod transcripts;
