// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `hatch inspect` command implementation.

use std::io::Write;
use std::path::Path;

use hatch_plugin::{Archive, DescriptorReader, DirArchive, PluginDescriptor, data_dir_for};

use crate::CommandError;

/// Read the descriptor of the archive at `path` and print it, along with
/// the data directory the plugin would get under `data_root`.
pub fn run_inspect(
    path: &Path,
    reader: &DescriptorReader,
    data_root: Option<&Path>,
    out: &mut impl Write,
) -> Result<(), CommandError> {
    let archive = DirArchive::open(path)?;
    let descriptor = reader.read(&archive)?;
    let data_dir = data_dir_for(data_root, archive.location(), &descriptor.name);
    write_descriptor(&descriptor, &archive, &data_dir, out).map_err(|source| CommandError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_descriptor(
    descriptor: &PluginDescriptor,
    archive: &dyn Archive,
    data_dir: &Path,
    out: &mut impl Write,
) -> std::io::Result<()> {
    writeln!(out, "name:        {}", descriptor.name)?;
    writeln!(out, "version:     {}", descriptor.version)?;
    writeln!(out, "main:        {}", descriptor.main)?;
    writeln!(out, "origin:      {}", archive.origin())?;
    writeln!(out, "data dir:    {}", data_dir.display())?;
    if let Some(description) = &descriptor.description {
        writeln!(out, "description: {description}")?;
    }
    if !descriptor.authors.is_empty() {
        writeln!(out, "authors:     {}", descriptor.authors.join(", "))?;
    }
    writeln!(out, "depend:      {}", list_or_none(&descriptor.depend))?;
    writeln!(out, "softdepend:  {}", list_or_none(&descriptor.softdepend))?;
    match &descriptor.runtime {
        Some(req) => writeln!(out, "runtime:     {req}")?,
        None => writeln!(out, "runtime:     any")?,
    }
    Ok(())
}

fn list_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}
