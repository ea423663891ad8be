// src/aggregate.rs

//! Build aggregation: clear the previous output tree, then copy the final
//! artifacts into it.
//!
//! The two steps are not transactional. A failure after `clean` leaves the
//! output missing or partial and is reported as a filesystem error.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::{AssetflowError, Result};
use crate::fileset::{join_root, GlobSpec};
use crate::fs::FileSystem;

/// Delete `dir` (root-relative) recursively. A missing directory is not an
/// error.
pub fn clean(fs: &dyn FileSystem, root: &Path, dir: &Path) -> Result<bool> {
    let target = join_root(root, dir);
    if !fs.exists(&target) {
        debug!(dir = ?target, "nothing to clean");
        return Ok(false);
    }
    fs.remove_dir_all(&target)
        .map_err(|e| AssetflowError::filesystem(&target, e))?;
    info!(dir = ?target, "removed previous output");
    Ok(true)
}

/// Glob patterns (with `!` exclusions) selecting the distributable files,
/// with paths kept relative to `base`.
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    base: PathBuf,
    spec: GlobSpec,
}

impl ArtifactSet {
    pub fn new<I, S>(base: impl Into<PathBuf>, patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let base = base.into();
        let spec = GlobSpec::new(patterns)?.with_base(&base);
        Ok(Self { base, spec })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Copy every matching file to `dest/<path relative to base>`.
    pub fn copy(&self, fs: &dyn FileSystem, root: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
        let files = self.spec.collect(fs, root)?;
        let written = files.write_to(fs, &join_root(root, dest))?;
        info!(copied = written.len(), dest = ?dest, "copied build artifacts");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn clean_of_missing_dir_is_a_no_op() {
        let fs = MockFileSystem::new();
        assert!(!clean(&fs, Path::new("."), Path::new("dist")).unwrap());
    }

    #[test]
    fn copy_keeps_paths_relative_to_base() {
        let fs = MockFileSystem::new();
        fs.add_file("app/css/style.min.css", "css");
        fs.add_file("app/images/cat.avif", "img");
        fs.add_file("app/images/icon.svg", "svg");
        fs.add_file("app/images/sprite.svg", "sprite");

        let artifacts = ArtifactSet::new(
            "app",
            [
                "app/css/style.min.css",
                "app/images/*.*",
                "!app/images/*.svg",
                "app/images/sprite.svg",
            ],
        )
        .unwrap();
        artifacts.copy(&fs, Path::new("."), Path::new("dist")).unwrap();

        assert_eq!(
            fs.files_under("dist"),
            vec![
                PathBuf::from("dist/css/style.min.css"),
                PathBuf::from("dist/images/cat.avif"),
                PathBuf::from("dist/images/sprite.svg"),
            ]
        );
    }
}
