// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `hatch plan` command implementation.
//!
//! Reads every archive in a plugin directory and prints the order a batch
//! load would use, without linking or running any plugin code.

use std::io::Write;
use std::path::{Path, PathBuf};

use hatch_core::LoadError;
use hatch_plugin::{Archive, DescriptorReader, PluginDescriptor, discover, plan_load_order};
use tracing::debug;

use crate::CommandError;

/// One readable archive in the plugin directory.
#[derive(Debug)]
struct Entry {
    path: PathBuf,
    descriptor: PluginDescriptor,
}

impl AsRef<PluginDescriptor> for Entry {
    fn as_ref(&self) -> &PluginDescriptor {
        &self.descriptor
    }
}

/// Outcome of planning a directory.
#[derive(Debug, Default)]
pub struct Plan {
    /// Archive paths and plugin names, in load order.
    pub order: Vec<(PathBuf, String)>,
    /// Archives that would not load and why.
    pub rejected: Vec<(PathBuf, LoadError)>,
}

/// Compute the load plan for `dir` against an engine running `engine`.
pub fn plan_directory(
    dir: &Path,
    reader: &DescriptorReader,
    engine: &semver::Version,
    skip_soft: bool,
) -> Result<Plan, CommandError> {
    let archives = discover(dir, reader).map_err(|source| CommandError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut plan = Plan::default();
    let mut entries = Vec::new();
    for archive in archives {
        let path = archive.location().to_path_buf();
        let descriptor = match reader.read(&archive) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                plan.rejected.push((path, err));
                continue;
            }
        };
        if let Some(required) = &descriptor.runtime
            && !required.matches(engine)
        {
            plan.rejected.push((
                path,
                LoadError::IncompatibleRuntimeVersion {
                    plugin: descriptor.name.clone(),
                    required: required.clone(),
                    running: engine.clone(),
                },
            ));
            continue;
        }
        entries.push(Entry { path, descriptor });
    }
    debug!(dir = %dir.display(), candidates = entries.len(), "planning load order");

    let order = plan_load_order(entries, [], skip_soft);
    plan.order = order
        .order
        .into_iter()
        .map(|e| (e.path, e.descriptor.full_name()))
        .collect();
    plan.rejected
        .extend(order.unresolved.into_iter().map(|(e, err)| (e.path, err)));
    Ok(plan)
}

/// Run `hatch plan` and print the result.
pub fn run_plan(
    dir: &Path,
    reader: &DescriptorReader,
    engine: &semver::Version,
    skip_soft: bool,
    out: &mut impl Write,
) -> Result<(), CommandError> {
    let plan = plan_directory(dir, reader, engine, skip_soft)?;
    write_plan(dir, &plan, out).map_err(|source| CommandError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

fn write_plan(dir: &Path, plan: &Plan, out: &mut impl Write) -> std::io::Result<()> {
    if plan.order.is_empty() && plan.rejected.is_empty() {
        writeln!(out, "no plugins found in {}", dir.display())?;
        return Ok(());
    }

    writeln!(out, "load order for {}:", dir.display())?;
    for (i, (path, name)) in plan.order.iter().enumerate() {
        writeln!(out, "  {:>2}. {name} ({})", i + 1, folder(path))?;
    }
    if !plan.rejected.is_empty() {
        writeln!(out, "will not load:")?;
        for (path, err) in &plan.rejected {
            writeln!(out, "  {}: {err}", folder(path))?;
        }
    }
    Ok(())
}

fn folder(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
