// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background pipeline for lesson content.
//!
//! Functions subscribe to event names, run as sequences of memoized steps,
//! and are driven by a worker pulling from the durable SQLite queue.

pub mod chunk;
pub mod context;
pub mod embedding_cache;
pub mod function;
pub mod functions;
pub mod queue;
pub mod scan;
pub mod step;
pub mod text;
pub mod worker;

pub use context::{PipelineContext, PipelineSettings};
pub use embedding_cache::CachedEmbedder;
pub use function::{FunctionRegistry, PipelineFunction};
pub use queue::QueueTransport;
pub use step::StepContext;
pub use worker::{Settlement, Worker, WorkerOptions};
