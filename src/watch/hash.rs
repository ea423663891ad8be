// src/watch/hash.rs

//! Content hashes for `use_hash` watch rules.
//!
//! A rule with `use_hash = true` only fires when the combined hash of every
//! file it covers differs from the last one stored under the rule's key.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::{debug, info};

use crate::fileset::FileSet;
use crate::fs::FileSystem;
use crate::types::HashStorageMode;

/// Root-relative location of the hashes file.
pub const HASH_FILE_PATH: &str = ".assetflow/hashes";

/// Deterministic hash over a file set: path and contents of every entry,
/// in path order.
pub fn compute_hash_for_files(files: &FileSet) -> String {
    let mut entries: Vec<_> = files.iter().collect();
    entries.sort_by(|a, b| a.relative.cmp(&b.relative));

    let mut hasher = Hasher::new();
    for entry in entries {
        hasher.update(entry.relative.to_string_lossy().as_bytes());
        hasher.update(&[0]);
        hasher.update(blake3::hash(&entry.contents).as_bytes());
    }
    let hash = hasher.finalize().to_hex().to_string();
    debug!(hash = %hash, files = files.len(), "computed aggregate hash");
    hash
}

/// Abstract storage for rule hashes.
pub trait HashStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&mut self, key: &str, hash: &str) -> Result<()>;
    /// Remove hashes whose key is not in `active`.
    fn prune(&mut self, active: &[String]) -> Result<()>;
}

pub fn build_hash_store(
    mode: HashStorageMode,
    root: &Path,
    fs: Arc<dyn FileSystem>,
) -> Box<dyn HashStore> {
    match mode {
        HashStorageMode::File => Box::new(FileHashStore::new(root.to_path_buf(), fs)),
        HashStorageMode::Memory => Box::new(MemoryHashStore::default()),
    }
}

/// Stores hashes in `<root>/.assetflow/hashes`, one `key hash` per line.
pub struct FileHashStore {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileHashStore {
    pub fn new(root: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self { root, fs }
    }

    fn path(&self) -> PathBuf {
        self.root.join(HASH_FILE_PATH)
    }

    fn load_all(&self) -> Result<BTreeMap<String, String>> {
        let path = self.path();
        if !self.fs.exists(&path) {
            return Ok(BTreeMap::new());
        }
        let contents = self
            .fs
            .read_to_string(&path)
            .with_context(|| format!("reading hash file at {:?}", path))?;

        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .filter_map(|l| l.split_once(char::is_whitespace))
            .map(|(k, v)| (k.to_string(), v.trim().to_string()))
            .collect())
    }

    fn save_all(&self, map: &BTreeMap<String, String>) -> Result<()> {
        let mut out = String::new();
        for (key, hash) in map {
            out.push_str(key);
            out.push(' ');
            out.push_str(hash);
            out.push('\n');
        }
        let path = self.path();
        self.fs
            .write(&path, out.as_bytes())
            .with_context(|| format!("writing hash file at {:?}", path))
    }
}

impl HashStore for FileHashStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load_all()?.get(key).cloned())
    }

    fn save(&mut self, key: &str, hash: &str) -> Result<()> {
        let mut map = self.load_all()?;
        map.insert(key.to_string(), hash.to_string());
        self.save_all(&map)?;
        info!(rule = %key, hash = %hash, "stored rule hash (file)");
        Ok(())
    }

    fn prune(&mut self, active: &[String]) -> Result<()> {
        let mut map = self.load_all()?;
        let before = map.len();
        map.retain(|k, _| active.contains(k));
        if map.len() < before {
            self.save_all(&map)?;
            info!(removed = before - map.len(), "pruned stale rule hashes (file)");
        }
        Ok(())
    }
}

/// Stores hashes in memory only.
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    map: BTreeMap<String, String>,
}

impl HashStore for MemoryHashStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.get(key).cloned())
    }

    fn save(&mut self, key: &str, hash: &str) -> Result<()> {
        self.map.insert(key.to_string(), hash.to_string());
        Ok(())
    }

    fn prune(&mut self, active: &[String]) -> Result<()> {
        self.map.retain(|k, _| active.contains(k));
        Ok(())
    }
}
