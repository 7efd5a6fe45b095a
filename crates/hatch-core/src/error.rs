// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Hatch plugin runtime.
//!
//! Three families with different propagation rules:
//! - [`LoadError`] aborts a load and is returned to the caller.
//! - [`PluginError`] is what plugin code hands back from factories and hooks.
//!   The lifecycle manager logs hook failures instead of propagating them.
//! - [`SecurityViolation`] is an integrity failure and is always propagated.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{CodeOrigin, Permission};

/// Boxed error used for causes the runtime wraps but does not interpret.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that abort `load`. The loader registry is never modified when one
/// of these is returned.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Neither the primary nor the fallback metadata file exists in the archive.
    #[error("no plugin metadata in {} (looked for {})", .archive.display(), .searched.join(", "))]
    MissingMetadata {
        archive: PathBuf,
        searched: Vec<String>,
    },

    /// A metadata file exists but could not be parsed or failed validation.
    #[error("malformed metadata in {}/{entry}: {reason}", .archive.display())]
    MalformedMetadata {
        archive: PathBuf,
        entry: String,
        reason: String,
    },

    /// A hard dependency is not registered.
    #[error("unknown dependency: {0}")]
    UnknownDependency(String),

    /// A soft dependency is not registered and soft checks were requested.
    #[error("unknown soft dependency: {0}")]
    UnknownSoftDependency(String),

    /// The plugin requires a runtime version this engine does not satisfy.
    #[error("plugin {plugin} requires runtime {required}, running {running}")]
    IncompatibleRuntimeVersion {
        plugin: String,
        required: semver::VersionReq,
        running: semver::Version,
    },

    /// A plugin with the same (case-insensitive) name is already registered.
    #[error("plugin {0} is already loaded")]
    AlreadyLoaded(String),

    /// Another registered plugin was loaded from the same code origin.
    /// Permission checks map origins to plugins, so origins must be unique.
    #[error("plugin {plugin} comes from {origin}, which already belongs to {owner}")]
    DuplicateOrigin {
        plugin: String,
        origin: CodeOrigin,
        owner: String,
    },

    /// The archive could not be opened, or the plugin could not be
    /// instantiated. Wraps the originating cause.
    #[error("invalid plugin {name}: {source}")]
    InvalidPlugin { name: String, source: BoxError },
}

impl LoadError {
    /// Wrap a cause as [`LoadError::InvalidPlugin`].
    pub fn invalid(name: impl Into<String>, source: impl Into<BoxError>) -> Self {
        LoadError::InvalidPlugin {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Returns true for errors caused by a dependency that may appear later.
    ///
    /// Batch loaders use this to decide whether an archive is worth retrying
    /// once more plugins have been registered.
    pub fn is_missing_dependency(&self) -> bool {
        matches!(
            self,
            LoadError::UnknownDependency(_) | LoadError::UnknownSoftDependency(_)
        )
    }
}

/// Errors raised by plugin code: factories, initialization, and lifecycle hooks.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The entry-point symbol is missing or does not name a constructor.
    #[error("entry point `{symbol}` {reason}")]
    EntryPoint { symbol: String, reason: String },

    /// The plugin rejected its load context.
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// Generic failure reported by plugin code.
    #[error("{message}")]
    Failed {
        message: String,
        source: Option<BoxError>,
    },

    /// Plugin code panicked; the payload is rendered as text.
    #[error("plugin panicked: {0}")]
    Panicked(String),
}

impl PluginError {
    /// Shorthand for a [`PluginError::Failed`] without a source.
    pub fn failed(message: impl Into<String>) -> Self {
        PluginError::Failed {
            message: message.into(),
            source: None,
        }
    }
}

/// A privileged action was attempted by a caller that may not perform it.
#[derive(Debug, Error)]
pub enum SecurityViolation {
    /// The caller's origin is neither the engine nor any registered plugin.
    #[error("unrecognized caller {origin} attempted a privileged action ({permission})")]
    UnrecognizedCaller {
        origin: CodeOrigin,
        permission: Permission,
    },

    /// The permission policy refused a registered plugin.
    #[error("plugin {plugin} was denied {permission}: {reason}")]
    Denied {
        plugin: String,
        permission: Permission,
        reason: String,
    },
}
