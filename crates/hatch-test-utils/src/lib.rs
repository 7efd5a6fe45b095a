// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Hatch integration tests.
//!
//! # Components
//!
//! - [`ScriptedPlugin`] - plugin whose hooks succeed, fail or panic on demand
//! - [`FixtureLinker`] - code linker serving scripted plugins by name
//! - [`RecordingSink`] - event sink that keeps every event
//! - [`PluginSpec`] - builds metadata for memory and on-disk archives

pub mod archive;
pub mod linker;
pub mod mock_plugin;
pub mod sink;

pub use archive::PluginSpec;
pub use linker::FixtureLinker;
pub use mock_plugin::{CallLog, Hook, HookScript, ScriptedPlugin};
pub use sink::RecordingSink;
