// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Broadcast event sink.

use hatch_core::{EventSink, PluginEvent};
use tokio::sync::broadcast;
use tracing::trace;

const DEFAULT_CAPACITY: usize = 256;

/// Fans lifecycle events out to any number of subscribers.
///
/// Sending never blocks. Events sent while nobody is subscribed are
/// dropped, and slow subscribers observe a lag instead of holding up the
/// lifecycle manager.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<PluginEvent>,
}

impl BroadcastSink {
    /// Sink buffering up to `capacity` events per subscriber. A capacity of
    /// zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PluginEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventSink for BroadcastSink {
    fn emit(&self, event: PluginEvent) {
        if self.tx.send(event).is_err() {
            trace!("plugin event dropped, no subscribers");
        }
    }
}
