// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is an
//! error instead of a silently ignored setting.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level Hatch configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HatchConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub plugins: PluginsConfig,
}

/// Engine identity and logging.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Name used in log lines.
    #[serde(default = "default_engine_name")]
    pub name: String,

    /// Default log level (trace, debug, info, warn, error). `HATCH_LOG` or
    /// `RUST_LOG` override it at runtime.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: default_engine_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_engine_name() -> String {
    "hatch".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Where plugins live and how they are read.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PluginsConfig {
    /// Directory scanned for plugin archives.
    #[serde(default = "default_plugin_directory")]
    pub directory: PathBuf,

    /// Parent of per-plugin data directories. When unset, each plugin's
    /// data directory sits next to its archive.
    #[serde(default)]
    pub data_directory: Option<PathBuf>,

    /// Load plugins even when a soft dependency is missing.
    #[serde(default)]
    pub skip_soft_dependencies: bool,

    /// Metadata file name looked up first in each archive.
    #[serde(default = "default_primary_metadata")]
    pub primary_metadata: String,

    /// Metadata file name accepted when the primary one is absent.
    #[serde(default = "default_fallback_metadata")]
    pub fallback_metadata: String,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            directory: default_plugin_directory(),
            data_directory: None,
            skip_soft_dependencies: false,
            primary_metadata: default_primary_metadata(),
            fallback_metadata: default_fallback_metadata(),
        }
    }
}

fn default_plugin_directory() -> PathBuf {
    PathBuf::from("plugins")
}

fn default_primary_metadata() -> String {
    "properties.toml".to_string()
}

fn default_fallback_metadata() -> String {
    "plugin.toml".to_string()
}
