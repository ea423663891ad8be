#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use assetflow::config::{ConfigFile, ConfigSection, RawConfigFile, TaskConfig};
use assetflow::errors::Result;
use assetflow::registry::{CleanTask, CopyTask, PagesTask, ScriptsTask, StylesTask};
use assetflow::types::{HashStorageMode, TriggerWhileRunningBehaviour};
use assetflow::watch::WatchRule;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                task: BTreeMap::new(),
                watch: Vec::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_watch(mut self, rule: WatchRule) -> Self {
        self.config.watch.push(rule);
        self
    }

    pub fn with_behaviour(mut self, behaviour: TriggerWhileRunningBehaviour) -> Self {
        self.config.config.triggered_while_running_behaviour = behaviour;
        self
    }

    pub fn with_queue_length(mut self, len: usize) -> Self {
        self.config.config.queue_length = len;
        self
    }

    pub fn with_hash_storage(mut self, mode: HashStorageMode) -> Self {
        self.config.config.hash_storage_mode = mode;
        self
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// `kind = "styles"` with no prefixing targets.
pub fn styles(src: &[&str], dest: &str, output: &str) -> TaskConfig {
    TaskConfig::Styles(StylesTask {
        src: strings(src),
        dest: PathBuf::from(dest),
        output: output.to_string(),
        browsers: Vec::new(),
        load_paths: Vec::new(),
    })
}

pub fn scripts(src: &[&str], dest: &str, output: &str) -> TaskConfig {
    TaskConfig::Scripts(ScriptsTask {
        src: strings(src),
        dest: PathBuf::from(dest),
        output: output.to_string(),
    })
}

pub fn pages(src: &[&str], include_paths: &[&str], dest: &str) -> TaskConfig {
    TaskConfig::Pages(PagesTask {
        src: strings(src),
        include_paths: include_paths.iter().map(PathBuf::from).collect(),
        dest: PathBuf::from(dest),
    })
}

pub fn clean(dir: &str) -> TaskConfig {
    TaskConfig::Clean(CleanTask {
        dir: PathBuf::from(dir),
    })
}

pub fn copy(base: &str, artifacts: &[&str], dest: &str) -> TaskConfig {
    TaskConfig::Copy(CopyTask {
        base: PathBuf::from(base),
        artifacts: strings(artifacts),
        dest: PathBuf::from(dest),
    })
}

pub fn parallel(tasks: &[&str]) -> TaskConfig {
    TaskConfig::Parallel {
        tasks: strings(tasks),
    }
}

pub fn series(tasks: &[&str]) -> TaskConfig {
    TaskConfig::Series {
        tasks: strings(tasks),
    }
}
