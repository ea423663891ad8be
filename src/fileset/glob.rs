// src/fileset/glob.rs

//! Glob-based file selection.
//!
//! A pattern list is evaluated in order. Plain patterns add files; patterns
//! prefixed with `!` remove files matched by the plain patterns *before*
//! them, so a later plain pattern can re-include something an earlier
//! exclusion removed:
//!
//! ```text
//! app/images/*.*          include every image
//! !app/images/*.svg       ...except SVG icons
//! app/images/sprite.svg   ...but keep the packed sprite
//! ```
//!
//! An exclusion that names a directory excludes everything below it.
//! Selection always walks the literal source directory; it never looks at
//! a previous stage's output.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::errors::{AssetflowError, Result};
use crate::fileset::{join_root, root_relative, FileEntry, FileSet};
use crate::fs::FileSystem;

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// One positive pattern plus the exclusions that follow it.
#[derive(Clone)]
struct IncludePattern {
    raw: String,
    /// Literal directory prefix of the pattern; the walk starts here.
    base: PathBuf,
    /// How many levels below `base` the pattern can reach (`None` = any).
    max_depth: Option<usize>,
    /// No glob characters: names exactly one file, which must exist.
    literal: bool,
    matcher: GlobMatcher,
    excludes: Option<GlobSet>,
}

/// Compiled, ordered include/exclude pattern list.
#[derive(Clone)]
pub struct GlobSpec {
    patterns: Vec<String>,
    includes: Vec<IncludePattern>,
    /// Overrides each include's own base when computing relative paths.
    base: Option<PathBuf>,
}

impl fmt::Debug for GlobSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobSpec")
            .field("patterns", &self.patterns)
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl GlobSpec {
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(|p| normalize_pattern(p.as_ref()))
            .collect();

        let mut includes = Vec::new();
        for (idx, pattern) in patterns.iter().enumerate() {
            if pattern.starts_with('!') {
                if includes.is_empty() {
                    return Err(AssetflowError::ConfigError(format!(
                        "exclusion '{pattern}' must follow at least one include pattern"
                    )));
                }
                continue;
            }

            let later_excludes: Vec<&str> = patterns[idx + 1..]
                .iter()
                .filter_map(|p| p.strip_prefix('!'))
                .collect();

            let (base, max_depth) = glob_base(pattern);
            includes.push(IncludePattern {
                raw: pattern.clone(),
                base,
                max_depth,
                literal: !pattern.contains(GLOB_META),
                matcher: compile_glob(pattern)?.compile_matcher(),
                excludes: build_exclude_set(&later_excludes)?,
            });
        }

        Ok(Self {
            patterns,
            includes,
            base: None,
        })
    }

    /// Make relative paths relative to `base` instead of each pattern's
    /// own literal prefix.
    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Patterns as written (normalized).
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether a root-relative path (forward slashes) is selected.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.includes.iter().any(|inc| inc.selects(rel_path))
    }

    /// Collect all matching files below `root` and read their contents.
    ///
    /// A literal pattern whose file does not exist is an error; a glob that
    /// selects nothing is not.
    pub fn collect(&self, fs: &dyn FileSystem, root: &Path) -> Result<FileSet> {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut entries = Vec::new();

        for include in &self.includes {
            if include.literal {
                let path = join_root(root, &include.raw);
                if !fs.is_file(&path) {
                    return Err(AssetflowError::filesystem(path, anyhow!("source file not found")));
                }
            }

            let start = join_root(root, &include.base);
            if !fs.is_dir(&start) {
                debug!(pattern = %include.raw, dir = ?start, "glob base does not exist; nothing selected");
                continue;
            }

            let mut matched = Vec::new();
            walk(fs, &start, include.max_depth, &mut |path| {
                if let Some(rel) = root_relative(root, path) {
                    if include.selects(&rel) {
                        matched.push((path.to_path_buf(), rel));
                    }
                }
            })?;
            matched.sort();

            let relative_base = self.base.as_deref().unwrap_or(&include.base);
            for (path, rel) in matched {
                if !seen.insert(path.clone()) {
                    continue;
                }
                let relative = Path::new(&rel)
                    .strip_prefix(relative_base)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| PathBuf::from(&rel));
                let contents = fs
                    .read(&path)
                    .map_err(|e| AssetflowError::filesystem(&path, e))?;
                entries.push(FileEntry::new(relative, contents).with_origin(path));
            }
        }

        debug!(patterns = ?self.patterns, selected = entries.len(), "collected file set");
        Ok(FileSet::new(entries))
    }
}

impl IncludePattern {
    fn selects(&self, rel_path: &str) -> bool {
        if !self.matcher.is_match(rel_path) {
            return false;
        }
        match &self.excludes {
            Some(excludes) => !is_excluded(excludes, rel_path),
            None => true,
        }
    }
}

/// A path is excluded when it, or any directory above it, matches.
fn is_excluded(excludes: &GlobSet, rel_path: &str) -> bool {
    let mut current = Some(Path::new(rel_path));
    while let Some(path) = current {
        if path.as_os_str().is_empty() {
            break;
        }
        if excludes.is_match(path) {
            return true;
        }
        current = path.parent();
    }
    false
}

fn walk(
    fs: &dyn FileSystem,
    start: &Path,
    max_depth: Option<usize>,
    visit: &mut dyn FnMut(&Path),
) -> Result<()> {
    let mut stack = vec![(start.to_path_buf(), 1usize)];

    while let Some((dir, depth)) = stack.pop() {
        let children = fs
            .read_dir(&dir)
            .map_err(|e| AssetflowError::filesystem(&dir, e))?;
        for path in children {
            if fs.is_dir(&path) {
                if max_depth.is_none_or(|max| depth < max) {
                    stack.push((path, depth + 1));
                }
            } else if fs.is_file(&path) {
                visit(&path);
            }
        }
    }
    Ok(())
}

fn normalize_pattern(pattern: &str) -> String {
    let pattern = pattern.trim().replace('\\', "/");
    match pattern.strip_prefix('!') {
        Some(rest) => format!("!{}", rest.trim_start_matches("./")),
        None => pattern.trim_start_matches("./").to_string(),
    }
}

/// Literal directory prefix of a pattern and how deep below it the pattern
/// can reach. A pattern without glob characters names a single file, so
/// its base is the parent directory.
pub fn glob_base(pattern: &str) -> (PathBuf, Option<usize>) {
    let parts: Vec<&str> = pattern.split('/').filter(|p| !p.is_empty()).collect();
    let first_glob = parts.iter().position(|p| p.contains(GLOB_META));

    let split_at = match first_glob {
        Some(idx) => idx,
        None => parts.len().saturating_sub(1),
    };

    let base: PathBuf = parts[..split_at].iter().collect();
    let rest = &parts[split_at..];
    let max_depth = if rest.iter().any(|p| p.contains("**")) {
        None
    } else {
        Some(rest.len().max(1))
    };

    let base = if base.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        base
    };
    (base, max_depth)
}

fn compile_glob(pattern: &str) -> Result<globset::Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))
        .map_err(AssetflowError::from)
}

fn build_exclude_set(patterns: &[&str]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(compile_glob(pat)?);
    }
    let set = builder
        .build()
        .context("building exclusion glob set")
        .map_err(AssetflowError::from)?;
    Ok(Some(set))
}
