// src/registry/mod.rs

//! Named tasks and their composition.
//!
//! A [`Registry`] is built once, validated, and never changes afterwards.
//! Every task is one variant of the closed [`Task`] enum; there is no
//! string-to-behaviour dispatch at run time. Unknown or cyclic references
//! are rejected by [`RegistryBuilder::build`].

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{AssetflowError, Result};
use crate::pipeline::Pipeline;
use crate::types::{CompositionMode, TaskName};
use crate::watch::rules::WatchRule;

pub mod runner;
pub mod tasks;

pub use runner::{BuildContext, Runner, TaskFuture, WatchSettings};
pub use tasks::{
    CleanTask, CopyTask, FontsTask, ImagesTask, PagesTask, ScriptsTask, ServeTask, SpriteTask,
    StylesTask,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileTask {
    Pages(PagesTask),
    Styles(StylesTask),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleTask {
    Scripts(ScriptsTask),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertTask {
    Images(ImagesTask),
    Fonts(FontsTask),
    Sprite(SpriteTask),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateTask {
    Clean(CleanTask),
    Copy(CopyTask),
}

/// A unit of build work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Compile(CompileTask),
    Bundle(BundleTask),
    Convert(ConvertTask),
    Aggregate(AggregateTask),
    /// Serve the output root with live reload until interrupted.
    Serve(ServeTask),
    /// Run the registry's watch rules until interrupted.
    Watch,
    Composite {
        mode: CompositionMode,
        tasks: Vec<TaskName>,
    },
}

impl Task {
    pub fn parallel<I, S>(tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        Task::Composite {
            mode: CompositionMode::Parallel,
            tasks: tasks.into_iter().map(Into::into).collect(),
        }
    }

    pub fn series<I, S>(tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        Task::Composite {
            mode: CompositionMode::Series,
            tasks: tasks.into_iter().map(Into::into).collect(),
        }
    }

    /// Short kind label (matches the config `kind` values).
    pub fn kind(&self) -> &'static str {
        match self {
            Task::Compile(CompileTask::Pages(_)) => "pages",
            Task::Compile(CompileTask::Styles(_)) => "styles",
            Task::Bundle(BundleTask::Scripts(_)) => "scripts",
            Task::Convert(ConvertTask::Images(_)) => "images",
            Task::Convert(ConvertTask::Fonts(_)) => "fonts",
            Task::Convert(ConvertTask::Sprite(_)) => "sprite",
            Task::Aggregate(AggregateTask::Clean(_)) => "clean",
            Task::Aggregate(AggregateTask::Copy(_)) => "copy",
            Task::Serve(_) => "serve",
            Task::Watch => "watch",
            Task::Composite {
                mode: CompositionMode::Parallel,
                ..
            } => "parallel",
            Task::Composite {
                mode: CompositionMode::Series,
                ..
            } => "series",
        }
    }

    /// Member task names of a composite; empty for everything else.
    pub fn members(&self) -> &[TaskName] {
        match self {
            Task::Composite { tasks, .. } => tasks,
            _ => &[],
        }
    }

    /// The pipeline behind an asset-producing task.
    pub fn pipeline(&self) -> Result<Option<Pipeline>> {
        let pipeline = match self {
            Task::Compile(CompileTask::Pages(t)) => t.pipeline()?,
            Task::Compile(CompileTask::Styles(t)) => t.pipeline()?,
            Task::Bundle(BundleTask::Scripts(t)) => t.pipeline()?,
            Task::Convert(ConvertTask::Images(t)) => t.pipeline()?,
            Task::Convert(ConvertTask::Fonts(t)) => t.pipeline()?,
            Task::Convert(ConvertTask::Sprite(t)) => t.pipeline()?,
            _ => return Ok(None),
        };
        Ok(Some(pipeline))
    }

    /// Serve and watch run until the process is interrupted.
    pub fn is_long_running(&self) -> bool {
        matches!(self, Task::Serve(_) | Task::Watch)
    }
}

/// Immutable, validated task table plus watch rules.
#[derive(Debug, Clone)]
pub struct Registry {
    tasks: BTreeMap<TaskName, Task>,
    watch_rules: Vec<WatchRule>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Result<&Task> {
        self.tasks
            .get(name)
            .ok_or_else(|| AssetflowError::TaskNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Task)> {
        self.tasks.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn watch_rules(&self) -> &[WatchRule] {
        &self.watch_rules
    }

    /// Every task reachable from `name` through compositions, including
    /// `name` itself.
    pub fn closure(&self, name: &str) -> BTreeSet<&str> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![name];
        while let Some(current) = stack.pop() {
            let Some((key, task)) = self.tasks.get_key_value(current) else {
                continue;
            };
            if seen.insert(key.as_str()) {
                stack.extend(task.members().iter().map(String::as_str));
            }
        }
        seen
    }

    /// Whether running `name` ends up starting a task matching `pred`.
    pub fn closure_contains(&self, name: &str, pred: impl Fn(&Task) -> bool) -> bool {
        self.closure(name)
            .into_iter()
            .filter_map(|n| self.tasks.get(n))
            .any(pred)
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    tasks: BTreeMap<TaskName, Task>,
    watch_rules: Vec<WatchRule>,
    duplicates: Vec<TaskName>,
}

impl RegistryBuilder {
    pub fn register(mut self, name: impl Into<TaskName>, task: Task) -> Self {
        let name = name.into();
        if self.tasks.insert(name.clone(), task).is_some() {
            self.duplicates.push(name);
        }
        self
    }

    pub fn watch(mut self, rule: WatchRule) -> Self {
        self.watch_rules.push(rule);
        self
    }

    pub fn build(self) -> Result<Registry> {
        ensure_has_tasks(&self)?;
        ensure_unique_names(&self)?;
        validate_members(&self)?;
        validate_composition_graph(&self)?;
        validate_watch_rules(&self)?;

        Ok(Registry {
            tasks: self.tasks,
            watch_rules: self.watch_rules,
        })
    }
}

fn ensure_has_tasks(b: &RegistryBuilder) -> Result<()> {
    if b.tasks.is_empty() {
        return Err(AssetflowError::ConfigError(
            "at least one task must be registered".to_string(),
        ));
    }
    Ok(())
}

fn ensure_unique_names(b: &RegistryBuilder) -> Result<()> {
    match b.duplicates.first() {
        Some(name) => Err(AssetflowError::ConfigError(format!(
            "task '{name}' is registered more than once"
        ))),
        None => Ok(()),
    }
}

fn validate_members(b: &RegistryBuilder) -> Result<()> {
    for (name, task) in &b.tasks {
        if let Task::Composite { tasks, .. } = task {
            if tasks.is_empty() {
                return Err(AssetflowError::ConfigError(format!(
                    "composite task '{name}' has no members"
                )));
            }
        }
        for member in task.members() {
            if member == name {
                return Err(AssetflowError::ConfigError(format!(
                    "task '{name}' cannot contain itself"
                )));
            }
            if !b.tasks.contains_key(member) {
                return Err(AssetflowError::ConfigError(format!(
                    "task '{name}' refers to unknown task '{member}'"
                )));
            }
        }
    }
    Ok(())
}

fn validate_composition_graph(b: &RegistryBuilder) -> Result<()> {
    // Edge member -> composite.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for name in b.tasks.keys() {
        graph.add_node(name.as_str());
    }
    for (name, task) in &b.tasks {
        for member in task.members() {
            graph.add_edge(member.as_str(), name.as_str(), ());
        }
    }

    toposort(&graph, None).map(|_| ()).map_err(|cycle| {
        AssetflowError::CompositionCycle(format!(
            "task composition cycle involving '{}'",
            cycle.node_id()
        ))
    })
}

fn validate_watch_rules(b: &RegistryBuilder) -> Result<()> {
    for (idx, rule) in b.watch_rules.iter().enumerate() {
        if rule.paths.is_empty() {
            return Err(AssetflowError::ConfigError(format!(
                "watch rule #{idx} has no paths"
            )));
        }
        match (rule.reload_only, rule.tasks.is_empty()) {
            (true, false) => {
                return Err(AssetflowError::ConfigError(format!(
                    "watch rule #{idx} is reload_only but also lists tasks {:?}",
                    rule.tasks
                )));
            }
            (false, true) => {
                return Err(AssetflowError::ConfigError(format!(
                    "watch rule #{idx} has no tasks (set reload_only = true to only reload)"
                )));
            }
            _ => {}
        }
        for task in &rule.tasks {
            if !b.tasks.contains_key(task) {
                return Err(AssetflowError::ConfigError(format!(
                    "watch rule #{idx} refers to unknown task '{task}'"
                )));
            }
            // A rebuild must finish for the rule to return to idle.
            if reaches_long_running(b, task) {
                return Err(AssetflowError::ConfigError(format!(
                    "watch rule #{idx} cannot trigger '{task}': it never completes"
                )));
            }
        }
    }
    Ok(())
}

fn reaches_long_running(b: &RegistryBuilder, name: &str) -> bool {
    let mut stack = vec![name];
    let mut seen = BTreeSet::new();
    while let Some(current) = stack.pop() {
        if !seen.insert(current) {
            continue;
        }
        if let Some(task) = b.tasks.get(current) {
            if task.is_long_running() {
                return true;
            }
            stack.extend(task.members().iter().map(String::as_str));
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn clean(dir: &str) -> Task {
        Task::Aggregate(AggregateTask::Clean(CleanTask {
            dir: PathBuf::from(dir),
        }))
    }

    #[test]
    fn unknown_member_is_rejected_at_construction() {
        let err = Registry::builder()
            .register("build", Task::series(["clean", "copy"]))
            .register("clean", clean("dist"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("unknown task 'copy'"));
    }

    #[test]
    fn cycles_are_rejected() {
        let err = Registry::builder()
            .register("a", Task::parallel(["b"]))
            .register("b", Task::series(["a"]))
            .build()
            .unwrap_err();
        assert!(matches!(err, AssetflowError::CompositionCycle(_)));
    }

    #[test]
    fn watch_rules_cannot_start_long_running_tasks() {
        let err = Registry::builder()
            .register("watch", Task::Watch)
            .register("dev", Task::parallel(["watch"]))
            .watch(WatchRule::run(["app/**"], ["dev"]))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("never completes"));
    }

    #[test]
    fn closure_follows_nested_compositions() {
        let registry = Registry::builder()
            .register("clean", clean("dist"))
            .register("watch", Task::Watch)
            .register("inner", Task::parallel(["watch"]))
            .register("default", Task::series(["clean", "inner"]))
            .build()
            .unwrap();

        let closure: Vec<&str> = registry.closure("default").into_iter().collect();
        assert_eq!(closure, vec!["clean", "default", "inner", "watch"]);
        assert!(registry.closure_contains("default", |t| matches!(t, Task::Watch)));
        assert!(!registry.closure_contains("clean", |t| matches!(t, Task::Watch)));
        assert!(matches!(registry.get("nope"), Err(AssetflowError::TaskNotFound(_))));
    }
}
