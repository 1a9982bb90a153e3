//! File-based caches for registry snapshots and rewritten output.
//!
//! Snapshots are stored as `<dir>/<version>.json` and are never invalidated:
//! a new version string (or an explicit rebuild) is the only way to force a
//! new index. Rewritten sources are keyed by a SHA-256 digest of the
//! rewrite settings, the file's path identity and its content. Both default to `~/.cache/extdeps/`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use directories::ProjectDirs;
use sha2::{Digest, Sha256};

use super::ClassRegistry;
use crate::error::{Error, Result};

/// The per-user cache directory for `section`, created if missing.
fn default_dir(section: &str) -> Option<PathBuf> {
    ProjectDirs::from("", "", "extdeps").map(|dirs| dirs.cache_dir().join(section))
}

fn ensure_dir(dir: &Option<PathBuf>) {
    if let Some(dir) = dir {
        if let Err(e) = fs::create_dir_all(dir) {
            tracing::debug!(path = %dir.display(), error = %e, "failed to create cache dir");
        }
    }
}

/// Version-keyed store of registry snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    dir: Option<PathBuf>,
}

impl SnapshotCache {
    /// Store snapshots under `dir`, or the per-user cache dir when None.
    pub fn new(dir: Option<PathBuf>) -> Self {
        let dir = dir.or_else(|| default_dir("snapshots"));
        ensure_dir(&dir);
        Self { dir }
    }

    /// A cache that never hits and never stores.
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    /// The snapshot file for `version`.
    pub fn path(&self, version: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| {
            let filename = version.replace([':', '/', '\\'], "_");
            dir.join(format!("{}.json", filename))
        })
    }

    /// Restore the snapshot for `version`.
    ///
    /// A missing or unreadable snapshot is a miss, not an error.
    pub fn load(&self, version: &str) -> Option<ClassRegistry> {
        let path = self.path(version)?;
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(registry) => Some(registry),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt snapshot");
                None
            }
        }
    }

    /// Write the snapshot for `version`, replacing any previous one.
    pub fn store(&self, version: &str, registry: &ClassRegistry) -> Result<()> {
        let Some(path) = self.path(version) else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let content = serde_json::to_string(registry)?;
        fs::write(&path, content).map_err(|e| Error::io(&path, e))
    }
}

/// In-memory + file-based memo of rewritten sources.
pub struct ContentCache {
    memory: RwLock<HashMap<String, String>>,
    dir: Option<PathBuf>,
    scope: String,
}

impl ContentCache {
    /// Persist entries under `dir`, or the per-user cache dir when None.
    pub fn new(dir: Option<PathBuf>) -> Self {
        let dir = dir.or_else(|| default_dir("content"));
        ensure_dir(&dir);
        Self {
            memory: RwLock::new(HashMap::new()),
            dir,
            scope: String::new(),
        }
    }

    /// A cache that only lives in memory.
    pub fn in_memory() -> Self {
        Self {
            memory: RwLock::new(HashMap::new()),
            dir: None,
            scope: String::new(),
        }
    }

    /// Separate entries by the settings that shape the output (path table,
    /// registry versions). Entries written under another scope never hit.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Hex SHA-256 of the scope, path identity and source text.
    pub fn key(&self, src: &str, source: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.scope.as_bytes());
        hasher.update([0u8]);
        hasher.update(src.as_bytes());
        hasher.update([0u8]);
        hasher.update(source.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Previously rewritten output for this exact input.
    pub fn get(&self, src: &str, source: &str) -> Option<String> {
        let key = self.key(src, source);

        if let Some(hit) = self.memory.read().ok()?.get(&key) {
            return Some(hit.clone());
        }

        let output = fs::read_to_string(self.entry_path(&key)?).ok()?;
        if let Ok(mut memory) = self.memory.write() {
            memory.insert(key, output.clone());
        }
        Some(output)
    }

    /// Remember the rewritten output for this input.
    pub fn set(&self, src: &str, source: &str, output: &str) {
        let key = self.key(src, source);
        if let Some(path) = self.entry_path(&key) {
            if let Err(e) = fs::write(&path, output) {
                tracing::debug!(path = %path.display(), error = %e, "failed to persist rewrite");
            }
        }
        if let Ok(mut memory) = self.memory.write() {
            memory.insert(key, output.to_string());
        }
    }

    fn entry_path(&self, key: &str) -> Option<PathBuf> {
        self.dir.as_deref().map(|dir: &Path| dir.join(format!("content_{}", key)))
    }
}
