// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The plugin-facing trait and the context a plugin is initialized with.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hatch_core::PluginError;

use crate::descriptor::PluginDescriptor;
use crate::loader::ModuleLoader;
use crate::security::CallerToken;

/// Behaviour supplied by a plugin.
///
/// Every hook has a no-op default. Errors (and panics) returned from
/// `on_enable`/`on_disable` are logged by the lifecycle manager and never
/// abort the transition. An error from `initialize` aborts the load.
pub trait Plugin: Send {
    /// Called once, right after construction, while the plugin is loading.
    fn initialize(&mut self, ctx: PluginContext) -> Result<(), PluginError> {
        let _ = ctx;
        Ok(())
    }

    fn on_enable(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    fn on_disable(&mut self) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Everything a plugin learns about itself at load time.
#[derive(Debug, Clone)]
pub struct PluginContext {
    descriptor: Arc<PluginDescriptor>,
    data_dir: PathBuf,
    archive: PathBuf,
    loader: Arc<ModuleLoader>,
    token: CallerToken,
}

impl PluginContext {
    pub(crate) fn new(
        descriptor: Arc<PluginDescriptor>,
        data_dir: PathBuf,
        archive: PathBuf,
        loader: Arc<ModuleLoader>,
        token: CallerToken,
    ) -> Self {
        Self {
            descriptor,
            data_dir,
            archive,
            loader,
            token,
        }
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    /// Directory reserved for the plugin's own files. Not created eagerly.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Location of the archive the plugin was loaded from.
    pub fn archive(&self) -> &Path {
        &self.archive
    }

    /// The plugin's own loader, for resolving symbols from other plugins.
    pub fn loader(&self) -> &Arc<ModuleLoader> {
        &self.loader
    }

    /// Identity to present when calling privileged engine services.
    pub fn token(&self) -> &CallerToken {
        &self.token
    }
}
