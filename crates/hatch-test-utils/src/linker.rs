// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Code linker that serves scripted plugins.
//!
//! Every archive gets a [`ScriptedPlugin`] constructor under its declared
//! entry point. Plugins without a registered script use the default (all
//! hooks succeed). Extra data symbols can be attached per plugin.

use std::collections::HashMap;
use std::sync::Arc;

use hatch_core::PluginError;
use hatch_plugin::{Archive, CodeLinker, PluginContext, PluginDescriptor, SymbolTable};
use parking_lot::Mutex;
use tracing::debug;

use crate::mock_plugin::{CallLog, HookScript, ScriptedPlugin};

#[derive(Debug, Clone, Default)]
struct Fixture {
    script: HookScript,
    symbols: Vec<(String, String)>,
}

#[derive(Default)]
pub struct FixtureLinker {
    log: CallLog,
    fixtures: Mutex<HashMap<String, Fixture>>,
    contexts: Mutex<HashMap<String, Arc<Mutex<Option<PluginContext>>>>>,
}

impl FixtureLinker {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    /// Script the hooks of the plugin called `name`.
    pub fn with_plugin(self, name: &str, script: HookScript) -> Self {
        self.fixtures
            .lock()
            .entry(name.to_lowercase())
            .or_default()
            .script = script;
        self
    }

    /// Define a string data symbol in the archive of plugin `name`.
    pub fn with_symbol(self, name: &str, symbol: &str, value: &str) -> Self {
        self.fixtures
            .lock()
            .entry(name.to_lowercase())
            .or_default()
            .symbols
            .push((symbol.to_string(), value.to_string()));
        self
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }

    /// Context the plugin called `name` was initialized with, if any.
    pub fn context(&self, name: &str) -> Option<PluginContext> {
        self.contexts
            .lock()
            .get(&name.to_lowercase())
            .and_then(|slot| slot.lock().clone())
    }
}

impl CodeLinker for FixtureLinker {
    fn link(
        &self,
        descriptor: &PluginDescriptor,
        _archive: &dyn Archive,
        table: &mut SymbolTable,
    ) -> Result<(), PluginError> {
        let key = descriptor.name.to_lowercase();
        let fixture = self.fixtures.lock().get(&key).cloned().unwrap_or_default();
        let slot = Arc::clone(self.contexts.lock().entry(key).or_default());

        for (symbol, value) in fixture.symbols {
            table.define_data(symbol, value);
        }

        let name = descriptor.name.clone();
        let log = self.log.clone();
        let script = fixture.script;
        table.define_plugin(descriptor.main.clone(), move || {
            ScriptedPlugin::new(name.clone(), script.clone(), log.clone(), Arc::clone(&slot))
        });
        debug!(plugin = %descriptor.name, symbols = table.len(), "linked fixture archive");
        Ok(())
    }
}
