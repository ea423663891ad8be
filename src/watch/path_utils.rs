// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::Path;

use crate::fileset::root_relative;

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct prefix strip.
/// - If that fails (e.g. due to symlinks or different absolute prefixes),
///   we canonicalize both paths and try again.
///
/// Returns `None` if the path cannot be related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if path.is_absolute() == root.is_absolute() {
        if let Some(rel) = root_relative(root, path) {
            return Some(rel);
        }
    }

    // macOS reports /private/var/... for /var/...
    let (root_canon, path_canon) = (root.canonicalize().ok()?, path.canonicalize().ok()?);
    path_canon
        .strip_prefix(&root_canon)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}
