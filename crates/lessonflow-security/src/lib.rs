// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keeps credentials out of logs.
//!
//! Everything that reaches the log stream goes through [`RedactingWriter`];
//! call sites that deliberately mention a credential use [`key_fragment`].

pub mod redact;

pub use redact::{RedactingMakeWriter, RedactingWriter, key_fragment, redact};
