// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Collects every problem instead of stopping at the first one.

use crate::diagnostic::ConfigError;
use crate::model::HatchConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &HatchConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.engine.name.trim().is_empty() {
        errors.push(ConfigError::validation("engine.name", "must not be empty"));
    }

    let level = config.engine.log_level.trim().to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::validation(
            "engine.log_level",
            format!(
                "`{}` is not one of {}",
                config.engine.log_level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }

    if config.plugins.directory.as_os_str().is_empty() {
        errors.push(ConfigError::validation("plugins.directory", "must not be empty"));
    }

    if let Some(data) = &config.plugins.data_directory
        && data.as_os_str().is_empty()
    {
        errors.push(ConfigError::validation(
            "plugins.data_directory",
            "must not be empty when set",
        ));
    }

    for (key, name) in [
        ("plugins.primary_metadata", &config.plugins.primary_metadata),
        ("plugins.fallback_metadata", &config.plugins.fallback_metadata),
    ] {
        if name.trim().is_empty() {
            errors.push(ConfigError::validation(key, "must not be empty"));
        } else if name.starts_with('/') || name.split('/').any(|part| part == "..") {
            errors.push(ConfigError::validation(
                key,
                format!("`{name}` must be a path inside the archive"),
            ));
        }
    }

    if config.plugins.primary_metadata == config.plugins.fallback_metadata {
        errors.push(ConfigError::validation(
            "plugins.fallback_metadata",
            "must differ from plugins.primary_metadata",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
