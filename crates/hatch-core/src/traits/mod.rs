// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits the host environment implements.

pub mod sink;

pub use sink::{EventSink, NullSink};
