// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::defaults;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "Assetflow.toml";

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform
/// semantic validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_str(&contents)
}

pub fn parse_str(contents: &str) -> Result<RawConfigFile> {
    Ok(toml::from_str(contents)?)
}

/// Load a configuration file from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Builds the task registry, rejecting unknown task references and
///   composition cycles.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    ConfigFile::try_from(raw_config)
}

/// Like [`load_and_validate`], except that a missing file at the default
/// location falls back to the built-in layout. An explicitly named file
/// must exist.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    if path == default_config_path() && !path.exists() {
        info!("no {DEFAULT_CONFIG_FILE} found; using the built-in app/ -> dist/ layout");
        return defaults::builtin();
    }
    load_and_validate(path)
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}
