// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Hatch plugin runtime.
//!
//! This crate holds the pieces every other Hatch crate agrees on: the error
//! taxonomy, the value types that cross the engine/plugin boundary, and the
//! collaborator traits a host implements.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{BoxError, LoadError, PluginError, SecurityViolation};
pub use traits::{EventSink, NullSink};
pub use types::{CodeOrigin, LifecycleState, Permission, PluginEvent};
