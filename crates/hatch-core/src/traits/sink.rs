// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event sink for plugin lifecycle notifications.

use crate::types::PluginEvent;

/// Receives lifecycle events from the plugin manager.
///
/// `emit` is called while the lifecycle lock is held, so implementations
/// must not block for long and must not call back into the manager from
/// another thread.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PluginEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, event: PluginEvent) {
        tracing::trace!(plugin = event.plugin_name(), "lifecycle event dropped");
    }
}
