// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin loading runtime for Hatch.
//!
//! Reads plugin archives, checks their dependencies, gives each plugin an
//! isolated [`ModuleLoader`] with ordered cross-plugin symbol delegation,
//! and drives the load/enable/disable lifecycle. Privileged engine calls
//! are checked by the [`SecurityGate`] against the caller's origin.
//!
//! The host supplies a [`CodeLinker`] that turns an archive into symbols;
//! this crate never interprets plugin code itself.

pub mod archive;
pub mod descriptor;
pub mod discovery;
pub mod events;
pub mod loader;
pub mod manager;
pub mod plugin;
pub mod registry;
pub mod resolver;
pub mod security;
pub mod symbol;

#[cfg(test)]
pub(crate) mod testing;

pub use archive::{Archive, DirArchive, MemoryArchive};
pub use descriptor::{
    DescriptorReader, FALLBACK_METADATA, PRIMARY_METADATA, PluginDescriptor, parse_descriptor,
};
pub use discovery::{LoadReport, discover};
pub use events::BroadcastSink;
pub use loader::{CodeLinker, EngineContext, ModuleLoader};
pub use manager::{
    LoadedPlugin, PluginHandle, PluginLifecycleManager, PluginManagerBuilder, data_dir_for,
};
pub use plugin::{Plugin, PluginContext};
pub use registry::{LoaderRegistry, PluginKey};
pub use resolver::{DependencyResolver, KnownPlugins, LoadPlan, plan_load_order};
pub use security::{
    AllowAll, CallerToken, CapabilityKey, Decision, GateGuard, PermissionPolicy, SecurityGate,
};
pub use symbol::{PluginFactory, Symbol, SymbolTable, SymbolValue};
