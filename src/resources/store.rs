// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Read-only backing stores for configuration units.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use super::id::clean_path;

/// Hierarchical, read-only store keyed by absolute identifiers.
pub trait ResourceStore: Send + Sync {
    /// Read the full contents of the unit named by `id`.
    fn open(&self, id: &str) -> io::Result<Vec<u8>>;
}

/// Store backed by a directory on the local filesystem.
///
/// Identifier `/chains/mainnet.yaml` maps to `<root>/chains/mainnet.yaml`.
/// Identifiers are cleaned first, so `..` cannot leave the root.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for an identifier.
    pub fn path_for(&self, id: &str) -> PathBuf {
        let cleaned = clean_path(&format!("/{id}"));
        self.root.join(cleaned.trim_start_matches('/'))
    }
}

impl ResourceStore for FsStore {
    fn open(&self, id: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path_for(id))
    }
}

/// In-memory store, mostly for tests and embedded defaults.
///
/// Counts how often each unit was opened.
#[derive(Debug, Default)]
pub struct MemoryStore {
    units: RwLock<HashMap<String, Vec<u8>>>,
    opens: Mutex<HashMap<String, usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(self, id: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(id, contents);
        self
    }

    pub fn insert(&self, id: &str, contents: impl Into<Vec<u8>>) {
        if let Ok(mut units) = self.units.write() {
            units.insert(clean_path(&format!("/{id}")), contents.into());
        }
    }

    /// Number of times `id` has been opened.
    pub fn open_count(&self, id: &str) -> usize {
        self.opens
            .lock()
            .ok()
            .and_then(|opens| opens.get(&clean_path(id)).copied())
            .unwrap_or(0)
    }
}

impl ResourceStore for MemoryStore {
    fn open(&self, id: &str) -> io::Result<Vec<u8>> {
        let key = clean_path(id);
        if let Ok(mut opens) = self.opens.lock() {
            *opens.entry(key.clone()).or_default() += 1;
        }

        let units = self
            .units
            .read()
            .map_err(|_| io::Error::other("memory store lock poisoned"))?;
        units.get(&key).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no resource unit at {key}"))
        })
    }
}
