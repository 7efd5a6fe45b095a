// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for plugin archives.

use std::path::{Path, PathBuf};

use hatch_plugin::{FALLBACK_METADATA, MemoryArchive, PRIMARY_METADATA};

/// Metadata of a test plugin.
#[derive(Debug, Clone)]
pub struct PluginSpec {
    name: String,
    main: String,
    version: String,
    depend: Vec<String>,
    softdepend: Vec<String>,
    runtime: Option<String>,
}

impl PluginSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            main: format!("{}::Main", name.to_lowercase()),
            version: "1.0.0".to_string(),
            depend: Vec::new(),
            softdepend: Vec::new(),
            runtime: None,
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn depend(mut self, names: &[&str]) -> Self {
        self.depend = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn softdepend(mut self, names: &[&str]) -> Self {
        self.softdepend = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn runtime(mut self, requirement: &str) -> Self {
        self.runtime = Some(requirement.to_string());
        self
    }

    /// The `[plugin]` metadata document.
    pub fn to_toml(&self) -> String {
        let list = |names: &[String]| {
            names
                .iter()
                .map(|n| format!("\"{n}\""))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut out = format!(
            "[plugin]\nname = \"{}\"\nmain = \"{}\"\nversion = \"{}\"\ndepend = [{}]\nsoftdepend = [{}]\n",
            self.name,
            self.main,
            self.version,
            list(&self.depend),
            list(&self.softdepend),
        );
        if let Some(runtime) = &self.runtime {
            out.push_str(&format!("runtime = \"{runtime}\"\n"));
        }
        out
    }

    /// Memory archive at `/plugins/<name>` with the primary metadata file.
    pub fn memory(&self) -> MemoryArchive {
        MemoryArchive::new(format!("/plugins/{}", self.name))
            .with_entry(PRIMARY_METADATA, self.to_toml())
    }

    /// Write the archive as `<root>/<folder>/plugin.toml` (the fallback
    /// name) and return the archive directory.
    pub fn write_dir(&self, root: &Path, folder: &str) -> std::io::Result<PathBuf> {
        let dir = root.join(folder);
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join(FALLBACK_METADATA), self.to_toml())?;
        Ok(dir)
    }
}
