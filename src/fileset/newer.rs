// src/fileset/newer.rs

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{AssetflowError, Result};
use crate::fileset::{join_root, FileEntry, FileSet};
use crate::fs::FileSystem;

/// Skip predicate: keep a source only if its destination counterpart is
/// missing or older than the source.
///
/// The counterpart is `dest/<relative path>`, with the extension replaced
/// when the downstream adapter changes formats (`a.png` -> `a.avif`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewerThan {
    dest: PathBuf,
    extension: Option<String>,
}

impl NewerThan {
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        Self {
            dest: dest.into(),
            extension: None,
        }
    }

    pub fn with_extension(mut self, ext: impl Into<String>) -> Self {
        self.extension = Some(ext.into());
        self
    }

    /// Destination path that `entry` is compared against.
    pub fn target_for(&self, root: &Path, entry: &FileEntry) -> PathBuf {
        let relative = match &self.extension {
            Some(ext) => entry.relative_with_extension(ext),
            None => entry.relative.clone(),
        };
        join_root(root, self.dest.join(relative))
    }

    pub fn filter(&self, fs: &dyn FileSystem, root: &Path, set: FileSet) -> Result<FileSet> {
        let before = set.len();
        let mut kept = Vec::with_capacity(before);

        for entry in set {
            let Some(origin) = entry.origin.clone() else {
                kept.push(entry);
                continue;
            };

            let target = self.target_for(root, &entry);
            if !fs.exists(&target) {
                kept.push(entry);
                continue;
            }

            let source_time = fs
                .modified(&origin)
                .map_err(|e| AssetflowError::filesystem(&origin, e))?;
            let target_time = fs
                .modified(&target)
                .map_err(|e| AssetflowError::filesystem(&target, e))?;

            if source_time > target_time {
                kept.push(entry);
            } else {
                debug!(source = ?origin, target = ?target, "destination up to date; skipping");
            }
        }

        debug!(before, after = kept.len(), dest = ?self.dest, "applied newer-than filter");
        Ok(FileSet::new(kept))
    }
}
