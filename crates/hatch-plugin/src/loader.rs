// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-plugin module loaders and delegated symbol resolution.
//!
//! Each loaded plugin owns one [`ModuleLoader`] holding the symbols its
//! archive defines. Lookups go to the engine first, then to the plugin's own
//! table, then out to other plugins in a fixed order:
//!
//! 1. hard dependencies, in declared order
//! 2. soft dependencies, in declared order
//! 3. every other registered loader, in registration order
//!
//! A loader is never searched twice and never searches itself during
//! delegation. Dependency loaders are looked up by name when a lookup
//! happens, not when the loader is built, so a soft dependency that loads
//! later is still found.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use hatch_core::{CodeOrigin, PluginError};
use tracing::trace;

use crate::archive::Archive;
use crate::descriptor::PluginDescriptor;
use crate::registry::{LoaderRegistry, PluginKey, WeakRegistry};
use crate::symbol::{Symbol, SymbolTable};

/// Host hook that turns an archive into symbols.
///
/// The runtime never interprets archive contents beyond the metadata file;
/// a linker decides what code an archive provides and defines it in the
/// table it is handed. The table is already stamped with the archive's
/// origin.
pub trait CodeLinker: Send + Sync {
    fn link(
        &self,
        descriptor: &PluginDescriptor,
        archive: &dyn Archive,
        table: &mut SymbolTable,
    ) -> Result<(), PluginError>;
}

/// The engine's own loading context, parent of every module loader.
#[derive(Debug)]
pub struct EngineContext {
    version: semver::Version,
    symbols: SymbolTable,
}

impl EngineContext {
    pub fn new(version: semver::Version, origin: CodeOrigin) -> Self {
        Self {
            version,
            symbols: SymbolTable::new(origin),
        }
    }

    /// Engine runtime version, matched against plugins' `runtime` requirement.
    pub fn version(&self) -> &semver::Version {
        &self.version
    }

    /// Origin of engine code. Callers with this origin pass every
    /// permission check.
    pub fn origin(&self) -> &CodeOrigin {
        self.symbols.origin()
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Engine symbols, for the host to populate before plugins load.
    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }
}

/// Isolated resolution context of one plugin.
pub struct ModuleLoader {
    descriptor: Arc<PluginDescriptor>,
    key: PluginKey,
    parent: Arc<EngineContext>,
    local: SymbolTable,
    registry: WeakRegistry,
}

impl ModuleLoader {
    pub(crate) fn new(
        descriptor: Arc<PluginDescriptor>,
        parent: Arc<EngineContext>,
        local: SymbolTable,
        registry: &LoaderRegistry,
    ) -> Self {
        Self {
            key: descriptor.key(),
            descriptor,
            parent,
            local,
            registry: registry.downgrade(),
        }
    }

    /// Declared name of the owning plugin.
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn key(&self) -> PluginKey {
        self.key.clone()
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    /// Origin of the owning plugin's archive.
    pub fn origin(&self) -> &CodeOrigin {
        self.local.origin()
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.local
    }

    /// Look up a symbol defined by this plugin's own archive.
    pub fn find_local(&self, name: &str) -> Option<Symbol> {
        self.local.get(name).cloned()
    }

    /// Resolve a symbol the way the plugin's own code sees it.
    pub fn resolve(&self, name: &str) -> Option<Symbol> {
        if let Some(symbol) = self.parent.symbols().get(name) {
            return Some(symbol.clone());
        }
        self.find_local(name).or_else(|| self.resolve_delegated(name))
    }

    /// Search other plugins' loaders for a symbol not defined locally.
    ///
    /// Returns `None` when no loader defines it, or when the registry has
    /// already been dropped.
    pub fn resolve_delegated(&self, name: &str) -> Option<Symbol> {
        let registry = self.registry.upgrade()?;
        let snapshot = registry.snapshot();

        let mut searched = HashSet::new();
        searched.insert(self.key.clone());

        let declared = self
            .descriptor
            .depend
            .iter()
            .chain(self.descriptor.softdepend.iter())
            .map(String::as_str)
            .map(PluginKey::new);
        for key in declared {
            if !searched.insert(key.clone()) {
                continue;
            }
            if let Some(loader) = snapshot.get(&key)
                && let Some(symbol) = loader.find_local(name)
            {
                trace!(plugin = %self.name(), symbol = name, from = %loader.name(), "resolved from dependency");
                return Some(symbol);
            }
        }

        for loader in snapshot.iter() {
            if searched.contains(&loader.key) {
                continue;
            }
            if let Some(symbol) = loader.find_local(name) {
                trace!(plugin = %self.name(), symbol = name, from = %loader.name(), "resolved from registry");
                return Some(symbol);
            }
        }

        None
    }
}

impl fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("plugin", &self.descriptor.name)
            .field("origin", self.origin())
            .field("symbols", &self.local.names())
            .finish()
    }
}
