// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted plugin for lifecycle tests.
//!
//! Every hook call is appended to a shared [`CallLog`] as `"<name>:<hook>"`
//! before the scripted outcome is applied, so tests can assert call order
//! across plugins.

use std::sync::Arc;

use hatch_core::PluginError;
use hatch_plugin::{Plugin, PluginContext};
use parking_lot::Mutex;

/// Outcome of one hook.
#[derive(Debug, Clone, Default)]
pub enum Hook {
    #[default]
    Succeed,
    Fail(String),
    Panic(String),
}

impl Hook {
    fn run(&self) -> Result<(), PluginError> {
        match self {
            Hook::Succeed => Ok(()),
            Hook::Fail(message) => Err(PluginError::failed(message.clone())),
            Hook::Panic(message) => panic!("{message}"),
        }
    }
}

/// Outcomes for each hook of a [`ScriptedPlugin`].
#[derive(Debug, Clone, Default)]
pub struct HookScript {
    pub initialize: Hook,
    pub enable: Hook,
    pub disable: Hook,
}

impl HookScript {
    pub fn failing_enable(message: &str) -> Self {
        Self {
            enable: Hook::Fail(message.to_string()),
            ..Self::default()
        }
    }

    pub fn panicking_disable(message: &str) -> Self {
        Self {
            disable: Hook::Panic(message.to_string()),
            ..Self::default()
        }
    }
}

/// Shared, ordered record of hook calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: String) {
        self.entries.lock().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Number of recorded calls equal to `entry`.
    pub fn count(&self, entry: &str) -> usize {
        self.entries.lock().iter().filter(|e| *e == entry).count()
    }
}

/// A plugin driven by a [`HookScript`].
pub struct ScriptedPlugin {
    name: String,
    script: HookScript,
    log: CallLog,
    context: Arc<Mutex<Option<PluginContext>>>,
}

impl ScriptedPlugin {
    pub fn new(
        name: impl Into<String>,
        script: HookScript,
        log: CallLog,
        context: Arc<Mutex<Option<PluginContext>>>,
    ) -> Self {
        Self {
            name: name.into(),
            script,
            log,
            context,
        }
    }
}

impl Plugin for ScriptedPlugin {
    fn initialize(&mut self, ctx: PluginContext) -> Result<(), PluginError> {
        self.log.record(format!("{}:initialize", self.name));
        *self.context.lock() = Some(ctx);
        self.script.initialize.run()
    }

    fn on_enable(&mut self) -> Result<(), PluginError> {
        self.log.record(format!("{}:enable", self.name));
        self.script.enable.run()
    }

    fn on_disable(&mut self) -> Result<(), PluginError> {
        self.log.record(format!("{}:disable", self.name));
        self.script.disable.run()
    }
}
