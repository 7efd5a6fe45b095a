// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin lifecycle: load, enable, disable.
//!
//! All lifecycle operations are serialized by one reentrant lock, so a hook
//! may call back into the manager on its own thread. A hook asking to
//! enable or disable its own plugin is refused instead of deadlocking. Entry-point
//! instantiation additionally runs inside the security gate's critical
//! section. A plugin is registered only after it was constructed and
//! initialized, so a failed load leaves the registry untouched.
//!
//! Lifecycle hooks are untrusted. Errors and panics from `on_enable` and
//! `on_disable` are logged with the plugin name and phase; the state change
//! and its event happen regardless.

use std::fmt;
use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hatch_config::model::PluginsConfig;
use hatch_core::{
    CodeOrigin, EventSink, LifecycleState, LoadError, NullSink, Permission, PluginError,
    PluginEvent, SecurityViolation,
};
use parking_lot::{Mutex, MutexGuard, ReentrantMutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::archive::{Archive, DirArchive};
use crate::descriptor::{DescriptorReader, PluginDescriptor};
use crate::loader::{CodeLinker, EngineContext, ModuleLoader};
use crate::plugin::{Plugin, PluginContext};
use crate::registry::{LoaderRegistry, PluginKey};
use crate::resolver::DependencyResolver;
use crate::security::{AllowAll, CallerToken, CapabilityKey, PermissionPolicy, SecurityGate};
use crate::symbol::SymbolTable;

/// Shared handle to a loaded plugin.
pub type PluginHandle = Arc<LoadedPlugin>;

/// A plugin that has been loaded. Lives until the manager is dropped.
pub struct LoadedPlugin {
    descriptor: Arc<PluginDescriptor>,
    loader: Arc<ModuleLoader>,
    archive: PathBuf,
    data_dir: PathBuf,
    state: Mutex<LifecycleState>,
    instance: Mutex<Box<dyn Plugin>>,
}

impl LoadedPlugin {
    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn loader(&self) -> &Arc<ModuleLoader> {
        &self.loader
    }

    pub fn archive(&self) -> &Path {
        &self.archive
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    pub fn is_enabled(&self) -> bool {
        self.state() == LifecycleState::Enabled
    }
}

impl fmt::Debug for LoadedPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedPlugin")
            .field("name", &self.descriptor.name)
            .field("version", &self.descriptor.version)
            .field("archive", &self.archive)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Builder for [`PluginLifecycleManager`].
pub struct PluginManagerBuilder {
    linker: Arc<dyn CodeLinker>,
    engine: Option<EngineContext>,
    sink: Arc<dyn EventSink>,
    policy: Arc<dyn PermissionPolicy>,
    key: Option<CapabilityKey>,
    data_root: Option<PathBuf>,
    reader: DescriptorReader,
    skip_soft: bool,
}

impl PluginManagerBuilder {
    pub fn new(linker: Arc<dyn CodeLinker>) -> Self {
        Self {
            linker,
            engine: None,
            sink: Arc::new(NullSink),
            policy: Arc::new(AllowAll),
            key: None,
            data_root: None,
            reader: DescriptorReader::default(),
            skip_soft: false,
        }
    }

    /// Builder taking metadata file names, data root and soft-dependency
    /// handling from the `[plugins]` configuration section.
    pub fn from_config(linker: Arc<dyn CodeLinker>, config: &PluginsConfig) -> Self {
        let mut builder = Self::new(linker)
            .descriptor_reader(DescriptorReader::new(
                config.primary_metadata.clone(),
                config.fallback_metadata.clone(),
            ))
            .skip_soft_dependencies(config.skip_soft_dependencies);
        if let Some(root) = &config.data_directory {
            builder = builder.data_root(root.clone());
        }
        builder
    }

    /// Engine context plugins are parented to. Defaults to this crate's
    /// version with an empty symbol table.
    pub fn engine(mut self, engine: EngineContext) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn policy(mut self, policy: Arc<dyn PermissionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Use a known capability key instead of generating one.
    pub fn capability_key(mut self, key: CapabilityKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Parent directory of per-plugin data directories. Defaults to the
    /// directory containing each archive.
    pub fn data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.data_root = Some(root.into());
        self
    }

    pub fn descriptor_reader(mut self, reader: DescriptorReader) -> Self {
        self.reader = reader;
        self
    }

    /// Make batch loading ignore soft dependencies.
    pub fn skip_soft_dependencies(mut self, skip: bool) -> Self {
        self.skip_soft = skip;
        self
    }

    /// Build the manager. Fails only if no capability key was supplied and
    /// the system random source is unavailable.
    pub fn build(self) -> io::Result<PluginLifecycleManager> {
        let key = match self.key {
            Some(key) => key,
            None => CapabilityKey::generate()?,
        };
        let engine = Arc::new(self.engine.unwrap_or_else(default_engine));
        let registry = LoaderRegistry::new();
        let gate = SecurityGate::new(
            key.clone(),
            engine.origin().clone(),
            registry.clone(),
            self.policy,
        );

        Ok(PluginLifecycleManager {
            engine,
            linker: self.linker,
            sink: self.sink,
            reader: self.reader,
            data_root: self.data_root,
            skip_soft: self.skip_soft,
            key,
            registry,
            gate,
            plugins: RwLock::new(Vec::new()),
            lifecycle: ReentrantMutex::new(()),
        })
    }
}

fn default_engine() -> EngineContext {
    let version = semver::Version::parse(env!("CARGO_PKG_VERSION"))
        .unwrap_or_else(|_| semver::Version::new(0, 0, 0));
    EngineContext::new(version, CodeOrigin::new("engine:hatch"))
}

/// Orchestrates plugin loading and lifecycle transitions.
pub struct PluginLifecycleManager {
    engine: Arc<EngineContext>,
    linker: Arc<dyn CodeLinker>,
    sink: Arc<dyn EventSink>,
    reader: DescriptorReader,
    data_root: Option<PathBuf>,
    skip_soft: bool,
    key: CapabilityKey,
    registry: LoaderRegistry,
    gate: SecurityGate,
    plugins: RwLock<Vec<PluginHandle>>,
    lifecycle: ReentrantMutex<()>,
}

impl PluginLifecycleManager {
    pub fn builder(linker: Arc<dyn CodeLinker>) -> PluginManagerBuilder {
        PluginManagerBuilder::new(linker)
    }

    /// Open the directory at `path` and load it as an archive.
    pub fn load_path(&self, path: &Path, skip_soft: bool) -> Result<PluginHandle, LoadError> {
        let archive = DirArchive::open(path)?;
        self.load(&archive, skip_soft)
    }

    /// Load a plugin from an archive.
    ///
    /// On error nothing is registered and no plugin code remains referenced.
    pub fn load(&self, archive: &dyn Archive, skip_soft: bool) -> Result<PluginHandle, LoadError> {
        let _lifecycle = self.lifecycle.lock();

        let descriptor = self.reader.read(archive)?;
        if self.registry.contains(&descriptor.name) {
            return Err(LoadError::AlreadyLoaded(descriptor.name));
        }
        self.check_runtime(&descriptor)?;
        DependencyResolver::check(&descriptor, &self.registry, skip_soft)?;

        let origin = archive.origin();
        if let Some(owner) = self.registry.find_by_origin(&origin) {
            return Err(LoadError::DuplicateOrigin {
                plugin: descriptor.name,
                origin,
                owner: owner.name().to_string(),
            });
        }
        let mut table = SymbolTable::new(origin.clone());
        self.linker
            .link(&descriptor, archive, &mut table)
            .map_err(|e| LoadError::invalid(descriptor.name.clone(), e))?;

        let descriptor = Arc::new(descriptor);
        let loader = Arc::new(ModuleLoader::new(
            Arc::clone(&descriptor),
            Arc::clone(&self.engine),
            table,
            &self.registry,
        ));
        let archive_path = archive.location().to_path_buf();
        let data_dir = data_dir_for(self.data_root.as_deref(), &archive_path, &descriptor.name);

        let instance = {
            let _section = self.gate.critical_section(&self.key);
            let ctx = PluginContext::new(
                Arc::clone(&descriptor),
                data_dir.clone(),
                archive_path.clone(),
                Arc::clone(&loader),
                CallerToken::new(origin),
            );
            instantiate(&loader, ctx)
        }
        .map_err(|e| LoadError::invalid(descriptor.name.clone(), e))?;

        self.registry.insert(Arc::clone(&loader))?;
        let plugin = Arc::new(LoadedPlugin {
            descriptor,
            loader,
            archive: archive_path,
            data_dir,
            state: Mutex::new(LifecycleState::Loaded),
            instance: Mutex::new(instance),
        });
        self.plugins.write().push(Arc::clone(&plugin));

        info!(plugin = %plugin.descriptor.full_name(), archive = %plugin.archive.display(), "plugin loaded");
        Ok(plugin)
    }

    /// Enable a plugin. Returns false if it was already enabled, or if the
    /// call comes from one of the plugin's own hooks.
    pub fn enable(&self, plugin: &LoadedPlugin) -> bool {
        let _lifecycle = self.lifecycle.lock();
        let Some(mut instance) = hook_slot(plugin, "enable") else {
            return false;
        };
        {
            let mut state = plugin.state.lock();
            if *state == LifecycleState::Enabled {
                return false;
            }
            *state = LifecycleState::Enabled;
        }

        info!(plugin = %plugin.descriptor.full_name(), "enabling plugin");
        let outcome = isolate(|| instance.on_enable());
        drop(instance);
        if let Err(e) = outcome {
            error!(plugin = %plugin.descriptor.full_name(), phase = "enable", error = %e, "plugin hook failed");
        }

        self.sink.emit(PluginEvent::Enabled {
            name: plugin.descriptor.name.clone(),
            version: plugin.descriptor.version.clone(),
        });
        true
    }

    /// Disable a plugin. Returns false if it was not enabled, or if the
    /// call comes from one of the plugin's own hooks.
    pub fn disable(&self, plugin: &LoadedPlugin) -> bool {
        let _lifecycle = self.lifecycle.lock();
        let Some(mut instance) = hook_slot(plugin, "disable") else {
            return false;
        };
        {
            let mut state = plugin.state.lock();
            if *state != LifecycleState::Enabled {
                return false;
            }
            *state = LifecycleState::Disabled;
        }

        info!(plugin = %plugin.descriptor.full_name(), "disabling plugin");
        let outcome = isolate(|| instance.on_disable());
        drop(instance);
        if let Err(e) = outcome {
            error!(plugin = %plugin.descriptor.full_name(), phase = "disable", error = %e, "plugin hook failed");
        }

        self.sink.emit(PluginEvent::Disabled {
            name: plugin.descriptor.name.clone(),
            version: plugin.descriptor.version.clone(),
        });
        true
    }

    /// Enable every loaded plugin in load order.
    pub fn enable_all(&self) {
        for plugin in self.plugins() {
            self.enable(&plugin);
        }
    }

    /// Disable every loaded plugin in reverse load order.
    pub fn disable_all(&self) {
        for plugin in self.plugins().iter().rev() {
            self.disable(plugin);
        }
    }

    /// Look up a loaded plugin by name, ignoring case.
    pub fn plugin(&self, name: &str) -> Option<PluginHandle> {
        let key = PluginKey::new(name);
        self.plugins
            .read()
            .iter()
            .find(|p| p.descriptor.key() == key)
            .cloned()
    }

    /// Loaded plugins in load order.
    pub fn plugins(&self) -> Vec<PluginHandle> {
        self.plugins.read().clone()
    }

    pub fn registry(&self) -> &LoaderRegistry {
        &self.registry
    }

    pub fn gate(&self) -> &SecurityGate {
        &self.gate
    }

    pub fn engine(&self) -> &EngineContext {
        &self.engine
    }

    pub fn descriptor_reader(&self) -> &DescriptorReader {
        &self.reader
    }

    /// Whether batch loading ignores soft dependencies.
    pub fn skip_soft_dependencies(&self) -> bool {
        self.skip_soft
    }

    /// Token for engine code making privileged calls. Only holders of the
    /// capability key get one.
    pub fn engine_token(&self, key: &CapabilityKey) -> Option<CallerToken> {
        self.gate.engine_token(key)
    }

    /// Check a privileged call. Violations are always returned to the caller.
    pub fn check_permission(
        &self,
        caller: &CallerToken,
        permission: &Permission,
    ) -> Result<(), SecurityViolation> {
        self.gate.check_permission(caller, permission)
    }

    fn check_runtime(&self, descriptor: &PluginDescriptor) -> Result<(), LoadError> {
        let Some(required) = &descriptor.runtime else {
            return Ok(());
        };
        let running = self.engine.version();
        if required.matches(running) {
            return Ok(());
        }

        error!(
            plugin = %descriptor.full_name(),
            required = %required,
            running = %running,
            "plugin was built for an incompatible runtime version"
        );
        Err(LoadError::IncompatibleRuntimeVersion {
            plugin: descriptor.name.clone(),
            required: required.clone(),
            running: running.clone(),
        })
    }

}

/// Data directory of plugin `name` loaded from `archive`: under `data_root`
/// when set, otherwise next to the archive.
pub fn data_dir_for(data_root: Option<&Path>, archive: &Path, name: &str) -> PathBuf {
    let base = data_root.unwrap_or_else(|| archive.parent().unwrap_or(archive));
    base.join(name)
}

impl fmt::Debug for PluginLifecycleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginLifecycleManager")
            .field("engine_version", self.engine.version())
            .field("registry", &self.registry)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

/// Lock the plugin instance for a hook call.
///
/// Only enable and disable take this lock, and only while holding the
/// lifecycle lock. If it is already held, the caller is a hook of this same
/// plugin re-entering on its own thread, and the transition is refused.
fn hook_slot<'a>(
    plugin: &'a LoadedPlugin,
    phase: &'static str,
) -> Option<MutexGuard<'a, Box<dyn Plugin>>> {
    let slot = plugin.instance.try_lock();
    if slot.is_none() {
        warn!(plugin = %plugin.descriptor.full_name(), phase, "plugin hook tried to change its own lifecycle state; ignored");
    }
    slot
}

/// Resolve the entry point, construct the plugin and initialize it.
fn instantiate(loader: &ModuleLoader, ctx: PluginContext) -> Result<Box<dyn Plugin>, PluginError> {
    let main = &loader.descriptor().main;
    let symbol = loader.resolve(main).ok_or_else(|| PluginError::EntryPoint {
        symbol: main.clone(),
        reason: "is not defined".to_string(),
    })?;
    let factory = symbol
        .as_factory()
        .cloned()
        .ok_or_else(|| PluginError::EntryPoint {
            symbol: main.clone(),
            reason: "is not a plugin constructor".to_string(),
        })?;
    debug!(plugin = %loader.name(), entry = %main, origin = %symbol.origin(), "instantiating plugin");

    let mut instance = isolate(|| factory.create())?;
    isolate(|| instance.initialize(ctx))?;
    Ok(instance)
}

/// Run plugin code, turning a panic into [`PluginError::Panicked`].
fn isolate<T>(f: impl FnOnce() -> Result<T, PluginError>) -> Result<T, PluginError> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = if let Some(s) = payload.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "non-string panic payload".to_string()
            };
            Err(PluginError::Panicked(message))
        }
    }
}
