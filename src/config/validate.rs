// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{AssetflowError, Result};
use crate::registry::Registry;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AssetflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;

        // Composition and watch rule checks live with the registry.
        let mut builder = Registry::builder();
        for (name, task) in raw.task {
            builder = builder.register(name, task.into());
        }
        for rule in raw.watch {
            builder = builder.watch(rule);
        }
        let registry = builder.build()?;

        Ok(ConfigFile::new_unchecked(raw.config, registry))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(AssetflowError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.queue_length == 0 {
        return Err(AssetflowError::ConfigError(
            "[config].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.config.source_root.is_absolute() {
        return Err(AssetflowError::ConfigError(format!(
            "[config].source_root must be relative to the config file (got {:?})",
            cfg.config.source_root
        )));
    }
    Ok(())
}
