// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./hatch.toml` > `~/.config/hatch/hatch.toml` > `/etc/hatch/hatch.toml`
//! with environment variable overrides via `HATCH_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use tracing::debug;

use crate::model::HatchConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/hatch/hatch.toml` (system-wide)
/// 3. `~/.config/hatch/hatch.toml` (user XDG config)
/// 4. `./hatch.toml` (local directory)
/// 5. `HATCH_*` environment variables
pub fn load_config() -> Result<HatchConfig, figment::Error> {
    let mut figment = Figment::new().merge(Serialized::defaults(HatchConfig::default()));
    for path in search_paths() {
        debug!(path = %path.display(), "configuration layer");
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(env_provider()).extract()
}

/// Config file locations, lowest precedence first.
pub(crate) fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/hatch/hatch.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("hatch").join("hatch.toml"));
    }
    paths.push(PathBuf::from("hatch.toml"));
    paths
}

/// Load configuration from a TOML string over the defaults. No env overrides.
pub fn load_config_from_str(toml_content: &str) -> Result<HatchConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HatchConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<HatchConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HatchConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Environment provider mapping `HATCH_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `Env::map()` rather than splitting on `_`, since keys such as
/// `skip_soft_dependencies` contain underscores. `HATCH_LOG` is the log
/// filter read by the binary and is not a configuration key.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("HATCH_").ignore(&["log"]).map(|key| {
        key.as_str()
            .replacen("engine_", "engine.", 1)
            .replacen("plugins_", "plugins.", 1)
            .into()
    })
}
