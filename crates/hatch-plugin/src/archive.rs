// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin archive containers.
//!
//! An archive is a named bag of entries plus a location that identifies it.
//! The location doubles as the plugin's code origin for permission checks.
//! How entries are stored (directory, embedded bytes, something compressed)
//! is up to the [`Archive`] implementation.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use hatch_core::{CodeOrigin, LoadError};

/// Read-only access to the contents of a plugin archive.
pub trait Archive: Send + Sync {
    /// Location the archive was opened from.
    fn location(&self) -> &Path;

    /// Read an entry by its archive-relative name.
    ///
    /// Returns `Ok(None)` when the entry does not exist.
    fn read_entry(&self, name: &str) -> io::Result<Option<Vec<u8>>>;

    /// Names of all entries, sorted, using `/` as separator.
    fn entry_names(&self) -> io::Result<Vec<String>>;

    /// Origin used to attribute code from this archive.
    fn origin(&self) -> CodeOrigin {
        CodeOrigin::from_path(self.location())
    }
}

/// A directory on disk treated as an archive.
#[derive(Debug, Clone)]
pub struct DirArchive {
    root: PathBuf,
}

impl DirArchive {
    /// Open a directory archive. Fails if the directory does not exist.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, LoadError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(LoadError::invalid(
                root.display().to_string(),
                format!("{} does not exist", root.display()),
            ));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }
}

impl Archive for DirArchive {
    fn location(&self) -> &Path {
        &self.root
    }

    fn read_entry(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        let relative = Path::new(name);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("entry name `{name}` escapes the archive"),
            ));
        }

        match std::fs::read(self.root.join(relative)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn entry_names(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        let mut pending = vec![(self.root.clone(), String::new())];
        while let Some((dir, prefix)) = pending.pop() {
            for entry in std::fs::read_dir(&dir)? {
                let entry = entry?;
                let name = format!("{prefix}{}", entry.file_name().to_string_lossy());
                if entry.file_type()?.is_dir() {
                    pending.push((entry.path(), format!("{name}/")));
                } else {
                    names.push(name);
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// An archive held entirely in memory.
///
/// Used by hosts that embed plugins in their own binary. The location is
/// nominal and only serves as identity.
#[derive(Debug, Clone)]
pub struct MemoryArchive {
    location: PathBuf,
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryArchive {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            entries: HashMap::new(),
        }
    }

    /// Add an entry, replacing any previous entry with the same name.
    pub fn with_entry(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.entries.insert(name.into(), bytes.into());
        self
    }
}

impl Archive for MemoryArchive {
    fn location(&self) -> &Path {
        &self.location
    }

    fn read_entry(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.entries.get(name).cloned())
    }

    fn entry_names(&self) -> io::Result<Vec<String>> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_archive_reads_existing_entry() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("plugin.toml"), "x").unwrap();

        let archive = DirArchive::open(dir.path()).unwrap();
        assert_eq!(archive.read_entry("plugin.toml").unwrap(), Some(b"x".to_vec()));
        assert_eq!(archive.read_entry("missing.toml").unwrap(), None);
    }

    #[test]
    fn dir_archive_lists_nested_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("lib")).unwrap();
        std::fs::write(dir.path().join("plugin.toml"), "x").unwrap();
        std::fs::write(dir.path().join("lib").join("core.wasm"), "y").unwrap();

        let archive = DirArchive::open(dir.path()).unwrap();
        assert_eq!(archive.entry_names().unwrap(), vec!["lib/core.wasm", "plugin.toml"]);
    }

    #[test]
    fn dir_archive_rejects_escaping_names() {
        let dir = tempfile::tempdir().unwrap();
        let archive = DirArchive::open(dir.path()).unwrap();

        let err = archive.read_entry("../secret").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(archive.read_entry("/etc/passwd").is_err());
    }

    #[test]
    fn dir_archive_open_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = DirArchive::open(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, LoadError::InvalidPlugin { .. }));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn memory_archive_origin_follows_location() {
        let archive = MemoryArchive::new("/embedded/core").with_entry("a", "b");
        assert_eq!(archive.origin(), CodeOrigin::new("file:///embedded/core"));
        assert_eq!(archive.read_entry("a").unwrap(), Some(b"b".to_vec()));
    }
}
