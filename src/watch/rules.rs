// src/watch/rules.rs

//! Watch rules: source globs bound to the tasks they rebuild.

use serde::Deserialize;

use crate::errors::Result;
use crate::fileset::GlobSpec;
use crate::types::TaskName;

/// `[[watch]]` entry.
///
/// ```toml
/// [[watch]]
/// paths = ["app/scss/**/*.scss"]
/// tasks = ["styles"]
///
/// [[watch]]
/// paths = ["app/*.html"]
/// reload_only = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WatchRule {
    /// Root-relative globs; `!` prefixes exclude.
    pub paths: Vec<String>,

    /// Tasks run (in parallel) when a matching file changes.
    #[serde(default)]
    pub tasks: Vec<TaskName>,

    /// Only notify live clients; run nothing.
    #[serde(default)]
    pub reload_only: bool,

    /// Only fire when the content hash over all matched files changed.
    #[serde(default)]
    pub use_hash: bool,
}

impl WatchRule {
    pub fn run<P, T>(paths: P, tasks: T) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<TaskName>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            tasks: tasks.into_iter().map(Into::into).collect(),
            reload_only: false,
            use_hash: false,
        }
    }

    pub fn reload_only<P>(paths: P) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            tasks: Vec::new(),
            reload_only: true,
            use_hash: false,
        }
    }

    pub fn with_hash(mut self) -> Self {
        self.use_hash = true;
        self
    }
}

/// A rule with its globs compiled.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    index: usize,
    rule: WatchRule,
    spec: GlobSpec,
}

impl CompiledRule {
    pub fn compile(index: usize, rule: WatchRule) -> Result<Self> {
        let spec = GlobSpec::new(&rule.paths)?;
        Ok(Self { index, rule, spec })
    }

    pub fn rule(&self) -> &WatchRule {
        &self.rule
    }

    pub fn spec(&self) -> &GlobSpec {
        &self.spec
    }

    /// Stable key for hash storage and logs (`watch#0`, `watch#1`, ...).
    pub fn key(&self) -> String {
        format!("watch#{}", self.index)
    }

    /// Whether a root-relative path (forward slashes) is covered.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.spec.matches(rel_path)
    }
}

pub fn compile_rules(rules: &[WatchRule]) -> Result<Vec<CompiledRule>> {
    rules
        .iter()
        .cloned()
        .enumerate()
        .map(|(idx, rule)| CompiledRule::compile(idx, rule))
        .collect()
}
