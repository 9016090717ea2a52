// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed event catalog and validating dispatcher for Lessonflow.
//!
//! Events are named by [`EventName`]; each name carries a JSON schema derived
//! from its payload type. [`EventBus::send`] checks the payload against that
//! schema and hands accepted events to an [`EventTransport`].

pub mod bus;
pub mod catalog;
pub mod events;
pub mod transport;

pub use bus::EventBus;
pub use catalog::EventCatalog;
pub use events::*;
pub use transport::{Event, EventTransport, EventUser, MemoryTransport};
