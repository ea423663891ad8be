// src/config/defaults.rs

//! The built-in project layout, used when no config file exists.

use crate::config::loader::parse_str;
use crate::config::model::ConfigFile;
use crate::errors::Result;

/// TOML source of the built-in layout.
pub const DEFAULT_CONFIG: &str = include_str!("default.toml");

pub fn builtin() -> Result<ConfigFile> {
    ConfigFile::try_from(parse_str(DEFAULT_CONFIG)?)
}
