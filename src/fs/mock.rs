// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { content: Vec<u8>, modified: SystemTime },
    Dir(Vec<String>), // List of child names
}

/// In-memory filesystem.
///
/// Modification times come from a logical clock that advances on every
/// write, so a file written later is always strictly newer.
#[derive(Debug, Clone)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
    clock: Arc<AtomicU64>,
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop `.` components so `./app/x` and `app/x` address the same entry.
fn key(path: &Path) -> PathBuf {
    let normalized: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

fn parent_key(path: &Path) -> Option<PathBuf> {
    if path == Path::new(".") {
        return None;
    }
    Some(match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    })
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut files = HashMap::new();
        // Ensure root exists
        files.insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            files: Arc::new(Mutex::new(files)),
            clock: Arc::new(AtomicU64::new(1)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn tick(&self) -> SystemTime {
        let t = self.clock.fetch_add(1, Ordering::SeqCst);
        UNIX_EPOCH + Duration::from_secs(t)
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = key(path.as_ref());
        let modified = self.tick();
        let mut files = self.lock();
        files.insert(
            path.clone(),
            MockEntry::File {
                content: content.into(),
                modified,
            },
        );
        Self::link_into_parent(&mut files, &path);
    }

    /// All file paths at or below `dir`, sorted.
    pub fn files_under(&self, dir: impl AsRef<Path>) -> Vec<PathBuf> {
        let dir = key(dir.as_ref());
        let files = self.lock();
        let mut out: Vec<PathBuf> = files
            .iter()
            .filter(|(p, e)| {
                matches!(e, MockEntry::File { .. }) && (dir == Path::new(".") || p.starts_with(&dir))
            })
            .map(|(p, _)| p.clone())
            .collect();
        out.sort();
        out
    }

    fn link_into_parent(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        let Some(parent) = parent_key(path) else {
            return;
        };
        if !files.contains_key(&parent) {
            files.insert(parent.clone(), MockEntry::Dir(Vec::new()));
            Self::link_into_parent(files, &parent);
        }
        if let Some(MockEntry::Dir(children)) = files.get_mut(&parent) {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if !children.iter().any(|c| c == name) {
                    children.push(name.to_string());
                }
            }
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let files = self.lock();
        match files.get(&key(path)) {
            Some(MockEntry::File { content, .. }) => Ok(content.clone()),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(&key(path))
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().get(&key(path)), Some(MockEntry::File { .. }))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().get(&key(path)), Some(MockEntry::Dir(_)))
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        match self.lock().get(&key(path)) {
            Some(MockEntry::File { modified, .. }) => Ok(*modified),
            Some(MockEntry::Dir(_)) => Ok(UNIX_EPOCH),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let path = key(path);
        let mut files = self.lock();
        if !matches!(files.get(&path), Some(MockEntry::Dir(_))) {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }
        files.retain(|p, _| !p.starts_with(&path));
        if let Some(parent) = parent_key(&path) {
            if let Some(MockEntry::Dir(children)) = files.get_mut(&parent) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    children.retain(|c| c != name);
                }
            }
        }
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.lock();
        let dir = key(path);
        match files.get(&dir) {
            Some(MockEntry::Dir(children)) => Ok(children.iter().map(|name| path.join(name)).collect()),
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_writes_are_strictly_newer() {
        let fs = MockFileSystem::new();
        fs.add_file("app/a.txt", "a");
        fs.add_file("./app/b.txt", "b");

        let a = fs.modified(Path::new("./app/a.txt")).unwrap();
        let b = fs.modified(Path::new("app/b.txt")).unwrap();
        assert!(b > a);
        assert!(fs.is_dir(Path::new("app")));
    }

    #[test]
    fn remove_dir_all_drops_subtree_only() {
        let fs = MockFileSystem::new();
        fs.add_file("dist/css/a.css", "a");
        fs.add_file("dist/index.html", "i");
        fs.add_file("app/index.html", "i");

        fs.remove_dir_all(Path::new("dist")).unwrap();

        assert!(!fs.exists(Path::new("dist")));
        assert!(fs.exists(Path::new("app/index.html")));
        assert_eq!(fs.read_dir(Path::new(".")).unwrap(), vec![PathBuf::from("./app")]);
    }
}
