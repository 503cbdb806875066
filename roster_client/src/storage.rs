//! Persistence backends for the local cache
//!
//! A backend stores opaque text blobs under a collection key. The cache
//! always reads and writes a collection whole.

use crate::error::ClientResult;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Blob storage injected into [`crate::LocalCache`]
pub trait CacheStorage {
    /// Read the blob stored under `key`, `None` if nothing was saved yet
    fn load(&self, key: &str) -> ClientResult<Option<String>>;

    /// Replace the blob stored under `key`
    fn save(&mut self, key: &str, blob: &str) -> ClientResult<()>;
}

/// One JSON file per collection inside a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage in the default data directory: ~/.local/share/champion_roster
    pub fn in_default_dir() -> Self {
        Self::new(
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("champion_roster"),
        )
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the full path for a collection
    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl CacheStorage for FileStorage {
    fn load(&self, key: &str) -> ClientResult<Option<String>> {
        let path = self.path(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, key: &str, blob: &str) -> ClientResult<()> {
        std::fs::create_dir_all(&self.dir)?;

        // Write to a sibling file first so a crash never leaves half a blob
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, blob)?;
        std::fs::rename(&tmp, &path)?;

        log::debug!("Saved {} ({} bytes)", path.display(), blob.len());
        Ok(())
    }
}

/// In-memory storage, for tests and short-lived tools
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    blobs: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.blobs.get(key).map(String::as_str)
    }
}

impl CacheStorage for MemoryStorage {
    fn load(&self, key: &str) -> ClientResult<Option<String>> {
        Ok(self.blobs.get(key).cloned())
    }

    fn save(&mut self, key: &str, blob: &str) -> ClientResult<()> {
        self.blobs.insert(key.to_string(), blob.to_string());
        Ok(())
    }
}
