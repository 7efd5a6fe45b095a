// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Hatch plugin runtime.
//!
//! Settings come from compiled defaults, up to three `hatch.toml` files and
//! `HATCH_*` environment variables, in increasing precedence. Unknown keys
//! are rejected, and every problem found is returned as a [`ConfigError`]
//! diagnostic that [`render_errors`] prints with source context.
//!
//! ```no_run
//! match hatch_config::load_and_validate() {
//!     Ok(config) => println!("plugins in {}", config.plugins.directory.display()),
//!     Err(errors) => hatch_config::render_errors(&errors),
//! }
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{EngineConfig, HatchConfig, PluginsConfig};

use std::path::Path;

/// Load from the standard locations and validate.
pub fn load_and_validate() -> Result<HatchConfig, Vec<ConfigError>> {
    checked(loader::load_config(), || {
        loader::search_paths()
            .iter()
            .filter_map(|path| read_source(path))
            .collect()
    })
}

/// Load one explicit file (plus env overrides) and validate.
pub fn load_and_validate_path(path: &Path) -> Result<HatchConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_path(path), || {
        read_source(path).into_iter().collect()
    })
}

/// Load a TOML document (no env overrides) and validate.
pub fn load_and_validate_str(toml_content: &str) -> Result<HatchConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

/// Validate a loaded config, or turn the load error into diagnostics.
///
/// `sources` is only read on failure; it supplies file contents for spans.
fn checked(
    loaded: Result<HatchConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<HatchConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => validation::validate_config(&config).map(|()| config),
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources())),
    }
}

/// A config file's name as figment reports it, with its contents.
fn read_source(path: &Path) -> Option<(String, String)> {
    let content = std::fs::read_to_string(path).ok()?;
    let name = if path.is_relative() {
        std::env::current_dir()
            .map(|dir| dir.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    } else {
        path.to_path_buf()
    };
    Some((name.display().to_string(), content))
}
