// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin descriptor parsing from archive metadata files.
//!
//! Every archive carries one TOML metadata file with a `[plugin]` table. The
//! reader looks for the primary file name first and falls back to the
//! secondary one, so archives packaged for older hosts still load.

use std::collections::HashSet;
use std::path::Path;

use hatch_core::LoadError;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::archive::Archive;
use crate::registry::PluginKey;

/// Metadata file name looked up first.
pub const PRIMARY_METADATA: &str = "properties.toml";

/// Metadata file name accepted when the primary one is absent.
pub const FALLBACK_METADATA: &str = "plugin.toml";

/// Parsed, validated plugin metadata. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Unique plugin name, compared case-insensitively.
    pub name: String,
    /// Symbol naming the plugin's constructor.
    pub main: String,
    /// Plugin version (`0.0.0` when not declared).
    pub version: semver::Version,
    /// Human-readable description.
    pub description: Option<String>,
    pub authors: Vec<String>,
    /// Hard dependencies, in declared order.
    pub depend: Vec<String>,
    /// Soft dependencies, in declared order.
    pub softdepend: Vec<String>,
    /// Required engine runtime version, if any.
    pub runtime: Option<semver::VersionReq>,
}

impl PluginDescriptor {
    /// Registry key for this plugin.
    pub fn key(&self) -> PluginKey {
        PluginKey::new(&self.name)
    }

    /// Name and version, as used in log lines.
    pub fn full_name(&self) -> String {
        format!("{} v{}", self.name, self.version)
    }
}

impl AsRef<PluginDescriptor> for PluginDescriptor {
    fn as_ref(&self) -> &PluginDescriptor {
        self
    }
}

/// Intermediate TOML deserialization struct for a metadata file.
#[derive(Debug, Deserialize)]
struct DescriptorFile {
    plugin: DescriptorSection,
}

/// The `[plugin]` table.
#[derive(Debug, Deserialize)]
struct DescriptorSection {
    name: String,
    main: String,
    version: Option<String>,
    description: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    depend: Vec<String>,
    #[serde(default)]
    softdepend: Vec<String>,
    runtime: Option<String>,
}

/// Parse and validate descriptor TOML read from `entry` inside `archive`.
pub fn parse_descriptor(
    archive: &Path,
    entry: &str,
    toml_content: &str,
) -> Result<PluginDescriptor, LoadError> {
    let malformed = |reason: String| LoadError::MalformedMetadata {
        archive: archive.to_path_buf(),
        entry: entry.to_string(),
        reason,
    };

    let file: DescriptorFile = toml::from_str(toml_content).map_err(|e| malformed(e.to_string()))?;
    let section = file.plugin;

    let name = section.name.trim().to_string();
    if name.is_empty() {
        return Err(malformed("name must not be empty".to_string()));
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(malformed(format!("name `{name}` is not a valid directory name")));
    }

    let main = section.main.trim().to_string();
    if main.is_empty() {
        return Err(malformed("main must not be empty".to_string()));
    }

    let version = match section.version.as_deref() {
        Some(v) => semver::Version::parse(v)
            .map_err(|e| malformed(format!("invalid version `{v}`: {e}")))?,
        None => semver::Version::new(0, 0, 0),
    };

    let runtime = section
        .runtime
        .as_deref()
        .map(|r| {
            semver::VersionReq::parse(r)
                .map_err(|e| malformed(format!("invalid runtime requirement `{r}`: {e}")))
        })
        .transpose()?;

    let self_key = PluginKey::new(&name);
    let depend = validate_dependencies("depend", section.depend, &self_key).map_err(malformed)?;
    let softdepend =
        validate_dependencies("softdepend", section.softdepend, &self_key).map_err(malformed)?;

    Ok(PluginDescriptor {
        name,
        main,
        version,
        description: section.description,
        authors: section.authors,
        depend,
        softdepend,
        runtime,
    })
}

/// Reject empty, duplicate (case-insensitive) and self-referencing names.
fn validate_dependencies(
    field: &str,
    names: Vec<String>,
    self_key: &PluginKey,
) -> Result<Vec<String>, String> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(format!("{field} contains an empty name"));
        }
        let key = PluginKey::new(&name);
        if &key == self_key {
            return Err(format!("{field} lists the plugin itself"));
        }
        if !seen.insert(key) {
            return Err(format!("{field} lists `{name}` more than once"));
        }
        out.push(name);
    }
    Ok(out)
}

/// Extracts a [`PluginDescriptor`] from an archive.
#[derive(Debug, Clone)]
pub struct DescriptorReader {
    primary: String,
    fallback: String,
}

impl DescriptorReader {
    /// Reader with custom metadata file names.
    pub fn new(primary: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            fallback: fallback.into(),
        }
    }

    /// Metadata file names in lookup order.
    pub fn names(&self) -> [&str; 2] {
        [&self.primary, &self.fallback]
    }

    /// Read the descriptor, preferring the primary metadata file.
    pub fn read(&self, archive: &dyn Archive) -> Result<PluginDescriptor, LoadError> {
        let location = archive.location();
        for entry in self.names() {
            let bytes = match archive.read_entry(entry) {
                Ok(Some(bytes)) => bytes,
                Ok(None) => continue,
                Err(e) => {
                    warn!(archive = %location.display(), entry, error = %e, "problem reading plugin archive");
                    return Err(LoadError::invalid(location.display().to_string(), e));
                }
            };

            let content = String::from_utf8(bytes).map_err(|_| LoadError::MalformedMetadata {
                archive: location.to_path_buf(),
                entry: entry.to_string(),
                reason: "metadata is not valid UTF-8".to_string(),
            })?;
            return parse_descriptor(location, entry, &content);
        }

        Err(LoadError::MissingMetadata {
            archive: location.to_path_buf(),
            searched: self.names().iter().map(|n| n.to_string()).collect(),
        })
    }

    /// Whether the archive carries either metadata file.
    pub fn has_metadata(&self, archive: &dyn Archive) -> bool {
        self.names()
            .iter()
            .any(|entry| matches!(archive.read_entry(entry), Ok(Some(_))))
    }
}

impl Default for DescriptorReader {
    fn default() -> Self {
        Self::new(PRIMARY_METADATA, FALLBACK_METADATA)
    }
}
