// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::registry::{
    AggregateTask, BundleTask, CleanTask, CompileTask, ConvertTask, CopyTask, FontsTask,
    ImagesTask, PagesTask, Registry, ScriptsTask, ServeTask, SpriteTask, StylesTask, Task,
    WatchSettings,
};
use crate::types::{HashStorageMode, TaskName, TriggerWhileRunningBehaviour};
use crate::watch::rules::WatchRule;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// source_root = "app"
/// triggered_while_running_behaviour = "queue"
///
/// [task.styles]
/// kind = "styles"
/// src = ["app/scss/style.scss"]
/// dest = "app/css"
/// output = "style.min.css"
///
/// [[watch]]
/// paths = ["app/scss/**/*.scss"]
/// tasks = ["styles"]
/// ```
///
/// This is the unvalidated shape; use [`ConfigFile::try_from`] (or
/// `loader::load_and_validate`) to get a checked [`ConfigFile`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global behaviour config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All tasks from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// `[[watch]]` rules, in file order.
    #[serde(default)]
    pub watch: Vec<WatchRule>,
}

/// Validated configuration: global settings plus the task registry built
/// from the `[task.*]` tables and `[[watch]]` rules.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub registry: Registry,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(config: ConfigSection, registry: Registry) -> Self {
        Self { config, registry }
    }

    pub fn watch_settings(&self) -> WatchSettings {
        WatchSettings {
            source_root: self.config.source_root.clone(),
            behaviour: self.config.triggered_while_running_behaviour,
            queue_length: self.config.queue_length,
            hash_storage_mode: self.config.hash_storage_mode,
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConfigSection {
    /// Directory the watcher subscribes to.
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,

    /// `"queue"` (default) or `"cancel"`: what a trigger for a task that is
    /// still running does.
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Maximum number of queued re-runs per task.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,

    /// Where `use_hash` rules keep their hashes.
    #[serde(default)]
    pub hash_storage_mode: HashStorageMode,
}

fn default_source_root() -> PathBuf {
    PathBuf::from("app")
}

fn default_queue_length() -> usize {
    1
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            source_root: default_source_root(),
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: default_queue_length(),
            hash_storage_mode: HashStorageMode::default(),
        }
    }
}

/// `[task.<name>]` table, selected by its `kind` key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskConfig {
    Pages(PagesTask),
    Styles(StylesTask),
    Scripts(ScriptsTask),
    Images(ImagesTask),
    Fonts(FontsTask),
    Sprite(SpriteTask),
    Clean(CleanTask),
    Copy(CopyTask),
    Serve(ServeTask),
    Watch,
    Parallel { tasks: Vec<TaskName> },
    Series { tasks: Vec<TaskName> },
}

impl From<TaskConfig> for Task {
    fn from(cfg: TaskConfig) -> Self {
        match cfg {
            TaskConfig::Pages(t) => Task::Compile(CompileTask::Pages(t)),
            TaskConfig::Styles(t) => Task::Compile(CompileTask::Styles(t)),
            TaskConfig::Scripts(t) => Task::Bundle(BundleTask::Scripts(t)),
            TaskConfig::Images(t) => Task::Convert(ConvertTask::Images(t)),
            TaskConfig::Fonts(t) => Task::Convert(ConvertTask::Fonts(t)),
            TaskConfig::Sprite(t) => Task::Convert(ConvertTask::Sprite(t)),
            TaskConfig::Clean(t) => Task::Aggregate(AggregateTask::Clean(t)),
            TaskConfig::Copy(t) => Task::Aggregate(AggregateTask::Copy(t)),
            TaskConfig::Serve(t) => Task::Serve(t),
            TaskConfig::Watch => Task::Watch,
            TaskConfig::Parallel { tasks } => Task::parallel(tasks),
            TaskConfig::Series { tasks } => Task::series(tasks),
        }
    }
}
