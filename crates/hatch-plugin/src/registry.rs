// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide registry of plugin module loaders.
//!
//! The `LoaderRegistry` maps case-folded plugin names to the [`ModuleLoader`]
//! of each loaded plugin. Entries are appended, never removed, and iteration
//! follows registration order.
//!
//! Readers (delegated symbol resolution, permission checks) load an immutable
//! snapshot without locking. The only writer is the lifecycle manager, which
//! inserts while holding its lifecycle lock, so a plain load-clone-store is
//! enough to publish a new snapshot.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use hatch_core::{CodeOrigin, LoadError};

use crate::loader::ModuleLoader;

/// Case-insensitive plugin name used as registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginKey(String);

impl PluginKey {
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PluginKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable view of the registry at one point in time.
#[derive(Default, Clone)]
pub(crate) struct Snapshot {
    order: Vec<Arc<ModuleLoader>>,
    index: HashMap<PluginKey, usize>,
}

impl Snapshot {
    pub(crate) fn get(&self, key: &PluginKey) -> Option<&Arc<ModuleLoader>> {
        self.index.get(key).map(|&i| &self.order[i])
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<ModuleLoader>> {
        self.order.iter()
    }
}

/// Shared handle to the loader registry. Cloning is cheap.
#[derive(Clone, Default)]
pub struct LoaderRegistry {
    inner: Arc<ArcSwap<Snapshot>>,
}

/// Non-owning handle held by module loaders.
#[derive(Clone, Default)]
pub(crate) struct WeakRegistry {
    inner: Weak<ArcSwap<Snapshot>>,
}

impl WeakRegistry {
    pub(crate) fn upgrade(&self) -> Option<LoaderRegistry> {
        self.inner.upgrade().map(|inner| LoaderRegistry { inner })
    }
}

impl LoaderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.load_full()
    }

    pub(crate) fn downgrade(&self) -> WeakRegistry {
        WeakRegistry {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Register a loader under its plugin's name.
    ///
    /// Fails with [`LoadError::AlreadyLoaded`] when the case-folded name is
    /// taken, and with [`LoadError::DuplicateOrigin`] when another loader
    /// has the same origin. Callers must serialize inserts.
    pub(crate) fn insert(&self, loader: Arc<ModuleLoader>) -> Result<(), LoadError> {
        let current = self.inner.load();
        let key = loader.key();
        if current.index.contains_key(&key) {
            return Err(LoadError::AlreadyLoaded(loader.name().to_string()));
        }
        if let Some(owner) = current.iter().find(|l| l.origin() == loader.origin()) {
            return Err(LoadError::DuplicateOrigin {
                plugin: loader.name().to_string(),
                origin: loader.origin().clone(),
                owner: owner.name().to_string(),
            });
        }

        let mut next = Snapshot::clone(&current);
        next.index.insert(key, next.order.len());
        next.order.push(loader);
        self.inner.store(Arc::new(next));
        Ok(())
    }

    /// Look up a loader by plugin name, ignoring case.
    pub fn get(&self, name: &str) -> Option<Arc<ModuleLoader>> {
        self.inner.load().get(&PluginKey::new(name)).cloned()
    }

    /// Whether a plugin with this name (ignoring case) is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.load().index.contains_key(&PluginKey::new(name))
    }

    /// Find the loader whose archive has the given origin.
    pub fn find_by_origin(&self, origin: &CodeOrigin) -> Option<Arc<ModuleLoader>> {
        self.inner
            .load()
            .iter()
            .find(|loader| loader.origin() == origin)
            .cloned()
    }

    /// All loaders in registration order.
    pub fn loaders(&self) -> Vec<Arc<ModuleLoader>> {
        self.inner.load().order.clone()
    }

    /// Registered plugin names (as declared) in registration order.
    pub fn names(&self) -> Vec<String> {
        self.inner
            .load()
            .iter()
            .map(|loader| loader.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.load().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.load().order.is_empty()
    }
}

impl fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}
