// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`), falling back to the
//!   built-in layout (`defaults.rs`).
//! - Validate it into a task registry (`validate.rs`).

pub mod defaults;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default, DEFAULT_CONFIG_FILE};
pub use model::{ConfigFile, ConfigSection, RawConfigFile, TaskConfig};
