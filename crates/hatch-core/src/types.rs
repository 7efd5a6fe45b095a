// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common value types shared by the loader, the security gate, and hosts.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identity of the code base a piece of code came from.
///
/// Plugins are identified by the location of their archive; the engine has
/// its own origin. Origins are compared by exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeOrigin(String);

impl CodeOrigin {
    /// Create an origin from an arbitrary location string.
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    /// Create a `file://` origin for an archive or binary on disk.
    pub fn from_path(path: &Path) -> Self {
        Self(format!("file://{}", path.display()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CodeOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A privileged action, optionally scoped to a target (a path, a host, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    name: String,
    target: Option<String>,
}

impl Permission {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: None,
        }
    }

    /// Scope this permission to a target.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => write!(f, "{}({target})", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Lifecycle state of a loaded plugin.
///
/// `Loaded` is only ever the initial state; afterwards a plugin toggles
/// between `Enabled` and `Disabled`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Loaded,
    Enabled,
    Disabled,
}

/// Lifecycle notification delivered to the host's event sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PluginEvent {
    /// The plugin was enabled (emitted even when its enable hook failed).
    Enabled { name: String, version: semver::Version },
    /// The plugin was disabled (emitted even when its disable hook failed).
    Disabled { name: String, version: semver::Version },
}

impl PluginEvent {
    /// Name of the plugin the event is about.
    pub fn plugin_name(&self) -> &str {
        match self {
            PluginEvent::Enabled { name, .. } | PluginEvent::Disabled { name, .. } => name,
        }
    }
}
