// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin directory scanning and batch loading.

use std::io;
use std::path::{Path, PathBuf};

use hatch_core::LoadError;
use tracing::{debug, info, warn};

use crate::archive::{Archive, DirArchive};
use crate::descriptor::DescriptorReader;
use crate::manager::{PluginHandle, PluginLifecycleManager};
use crate::resolver::run_passes;

/// Every immediate subdirectory of `dir` that carries plugin metadata,
/// sorted by path.
pub fn discover(dir: &Path, reader: &DescriptorReader) -> io::Result<Vec<DirArchive>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            paths.push(entry.path());
        }
    }
    paths.sort();

    let mut archives = Vec::new();
    for path in paths {
        let Ok(archive) = DirArchive::open(&path) else {
            continue;
        };
        if reader.has_metadata(&archive) {
            archives.push(archive);
        } else {
            debug!(path = %path.display(), "skipping directory without plugin metadata");
        }
    }
    Ok(archives)
}

/// Outcome of [`load_directory`].
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Plugins loaded, in load order.
    pub loaded: Vec<PluginHandle>,
    /// Archives that could not be loaded and why.
    pub failed: Vec<(PathBuf, LoadError)>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

impl PluginLifecycleManager {
    /// Discover and load every plugin archive under `dir`.
    ///
    /// Archives whose dependencies are not loaded yet are retried after
    /// the others; see [`crate::resolver`] for the pass rules. Soft
    /// dependencies are ignored throughout when the manager was built to
    /// skip them.
    pub fn load_directory(&self, dir: &Path) -> io::Result<LoadReport> {
        let archives = discover(dir, self.descriptor_reader())?;
        info!(dir = %dir.display(), count = archives.len(), "loading plugins");

        let passes = run_passes(archives, self.skip_soft_dependencies(), |archive, skip_soft| {
            self.load(archive, skip_soft)
        });

        let failed: Vec<(PathBuf, LoadError)> = passes
            .failed
            .into_iter()
            .map(|(archive, err)| (archive.location().to_path_buf(), err))
            .collect();
        for (path, err) in &failed {
            warn!(archive = %path.display(), error = %err, "could not load plugin");
        }

        Ok(LoadReport {
            loaded: passes.done.into_iter().map(|(_, plugin)| plugin).collect(),
            failed,
        })
    }
}
