// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixtures shared by unit tests.

use std::sync::Arc;

use hatch_core::{CodeOrigin, PluginError};

use crate::archive::{Archive, MemoryArchive};
use crate::descriptor::PluginDescriptor;
use crate::loader::{CodeLinker, EngineContext, ModuleLoader};
use crate::plugin::Plugin;
use crate::registry::LoaderRegistry;
use crate::symbol::SymbolTable;

pub(crate) struct NoopPlugin;

impl Plugin for NoopPlugin {}

/// Engine at version 1.0.0 with origin `engine:test`.
pub(crate) fn engine() -> EngineContext {
    EngineContext::new(semver::Version::new(1, 0, 0), CodeOrigin::new("engine:test"))
}

pub(crate) fn descriptor(name: &str, depend: &[&str], softdepend: &[&str]) -> PluginDescriptor {
    PluginDescriptor {
        name: name.to_string(),
        main: "main".to_string(),
        version: semver::Version::new(1, 0, 0),
        description: None,
        authors: Vec::new(),
        depend: depend.iter().map(|s| s.to_string()).collect(),
        softdepend: softdepend.iter().map(|s| s.to_string()).collect(),
        runtime: None,
    }
}

/// A loader at `/plugins/<name>` whose symbols hold the plugin name as data.
/// Not registered.
pub(crate) fn loader_with_engine(
    registry: &LoaderRegistry,
    engine: Arc<EngineContext>,
    name: &str,
    depend: &[&str],
    softdepend: &[&str],
    symbols: &[&str],
) -> Arc<ModuleLoader> {
    let origin = CodeOrigin::new(format!("file:///plugins/{name}"));
    let mut table = SymbolTable::new(origin);
    for symbol in symbols {
        table.define_data(*symbol, name.to_string());
    }
    Arc::new(ModuleLoader::new(
        Arc::new(descriptor(name, depend, softdepend)),
        engine,
        table,
        registry,
    ))
}

/// An empty loader for plugin `name` whose archive sits at `location`.
/// Not registered.
pub(crate) fn loader_at(
    registry: &LoaderRegistry,
    engine: Arc<EngineContext>,
    location: &str,
    name: &str,
) -> Arc<ModuleLoader> {
    Arc::new(ModuleLoader::new(
        Arc::new(descriptor(name, &[], &[])),
        engine,
        SymbolTable::new(CodeOrigin::new(format!("file://{location}"))),
        registry,
    ))
}

pub(crate) fn loader_for(
    registry: &LoaderRegistry,
    name: &str,
    depend: &[&str],
    softdepend: &[&str],
    symbols: &[&str],
) -> Arc<ModuleLoader> {
    loader_with_engine(registry, Arc::new(engine()), name, depend, softdepend, symbols)
}

/// Memory archive carrying only a primary metadata file.
pub(crate) fn metadata(location: &str, name: &str, depend: &[&str], softdepend: &[&str]) -> MemoryArchive {
    let list = |names: &[&str]| {
        names
            .iter()
            .map(|n| format!("\"{n}\""))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let toml = format!(
        "[plugin]\nname = \"{name}\"\nmain = \"main\"\nversion = \"1.0.0\"\ndepend = [{}]\nsoftdepend = [{}]\n",
        list(depend),
        list(softdepend)
    );
    MemoryArchive::new(location).with_entry("properties.toml", toml)
}

/// Links `main` to [`NoopPlugin`] and `banner` to a string in every archive.
pub(crate) struct StaticLinker;

impl CodeLinker for StaticLinker {
    fn link(
        &self,
        _descriptor: &PluginDescriptor,
        _archive: &dyn Archive,
        table: &mut SymbolTable,
    ) -> Result<(), PluginError> {
        table.define_plugin("main", || NoopPlugin);
        table.define_data("banner", String::from("hello"));
        Ok(())
    }
}
