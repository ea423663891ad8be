// src/fileset/mod.rs

//! In-memory file collections flowing between pipeline stages.
//!
//! - [`glob`] selects files from disk (with `!` exclusions).
//! - [`newer`] drops files whose destination counterpart is up to date.

pub mod glob;
pub mod newer;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{AssetflowError, Result};
use crate::fs::FileSystem;

pub use glob::GlobSpec;
pub use newer::NewerThan;

/// One file travelling through a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the glob base. Destinations mirror this path.
    pub relative: PathBuf,
    /// Where the entry was read from, if it came from disk.
    pub origin: Option<PathBuf>,
    pub contents: Vec<u8>,
}

impl FileEntry {
    pub fn new(relative: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            relative: relative.into(),
            origin: None,
            contents: contents.into(),
        }
    }

    pub fn with_origin(mut self, origin: impl Into<PathBuf>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Lowercased extension, if any.
    pub fn extension(&self) -> Option<String> {
        self.relative
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    pub fn file_stem(&self) -> String {
        self.relative
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string()
    }

    /// Same relative path with the extension swapped.
    pub fn relative_with_extension(&self, ext: &str) -> PathBuf {
        self.relative.with_extension(ext)
    }

    pub fn text(&self) -> std::result::Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.contents)
    }
}

/// Ordered collection of files. Each stage consumes one set and produces
/// the next; a set is never mutated in place once handed on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    entries: Vec<FileEntry>,
}

impl FileSet {
    pub fn new(entries: Vec<FileEntry>) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> Vec<FileEntry> {
        self.entries
    }

    pub fn get(&self, relative: impl AsRef<Path>) -> Option<&FileEntry> {
        let relative = relative.as_ref();
        self.entries.iter().find(|e| e.relative == relative)
    }

    /// Relative paths in set order.
    pub fn relative_paths(&self) -> Vec<PathBuf> {
        self.entries.iter().map(|e| e.relative.clone()).collect()
    }

    /// Write every entry to `dest/<relative>` and return the written paths.
    pub fn write_to(&self, fs: &dyn FileSystem, dest: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let target = dest.join(&entry.relative);
            fs.write(&target, &entry.contents)
                .map_err(|e| AssetflowError::filesystem(&target, e))?;
            debug!(path = ?target, bytes = entry.contents.len(), "wrote file");
            written.push(target);
        }
        Ok(written)
    }
}

impl FromIterator<FileEntry> for FileSet {
    fn from_iter<T: IntoIterator<Item = FileEntry>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IntoIterator for FileSet {
    type Item = FileEntry;
    type IntoIter = std::vec::IntoIter<FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Resolve a root-relative path. A root of `.` is left off so paths stay
/// in the same shape the patterns were written in.
pub fn join_root(root: &Path, rel: impl AsRef<Path>) -> PathBuf {
    let rel = rel.as_ref();
    if root.as_os_str().is_empty() || root == Path::new(".") || rel.is_absolute() {
        rel.to_path_buf()
    } else {
        root.join(rel)
    }
}

/// Convert a path into a string relative to `root`, with forward slashes.
pub fn root_relative(root: &Path, path: &Path) -> Option<String> {
    let rel = if root.as_os_str().is_empty() || root == Path::new(".") {
        path.strip_prefix(".").unwrap_or(path)
    } else {
        path.strip_prefix(root).ok()?
    };
    Some(rel.to_string_lossy().replace('\\', "/"))
}
