// src/errors.rs

//! Crate-wide error types.
//!
//! Two kinds of failure matter at runtime: a transform rejected its input
//! ([`TransformError`]) or a filesystem operation failed
//! ([`AssetflowError::Filesystem`]). Both travel up through pipelines and
//! the task runner unchanged apart from the stage or task name attached on
//! the way.

use std::path::PathBuf;

use thiserror::Error;

/// An external transformation rejected its input.
#[derive(Error, Debug)]
#[error("transform '{stage}' failed: {cause:#}")]
pub struct TransformError {
    /// Name of the adapter that failed (e.g. `"scss"`, `"avif"`).
    pub stage: String,
    pub cause: anyhow::Error,
}

impl TransformError {
    pub fn new(stage: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        Self {
            stage: stage.into(),
            cause: cause.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AssetflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in task composition: {0}")]
    CompositionCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("filesystem error at {path:?}: {cause:#}")]
    Filesystem { path: PathBuf, cause: anyhow::Error },

    #[error("task '{task}' failed: {inner}")]
    Task {
        task: String,
        inner: Box<AssetflowError>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AssetflowError {
    pub fn filesystem(path: impl Into<PathBuf>, cause: impl Into<anyhow::Error>) -> Self {
        AssetflowError::Filesystem {
            path: path.into(),
            cause: cause.into(),
        }
    }

    /// Attach the failing task's name.
    ///
    /// Errors that already carry a task name are returned as-is so nested
    /// compositions do not stack the same context repeatedly.
    pub fn in_task(self, task: &str) -> Self {
        match self {
            AssetflowError::Task { .. } => self,
            other => AssetflowError::Task {
                task: task.to_string(),
                inner: Box::new(other),
            },
        }
    }

    /// Innermost error with task context stripped.
    pub fn root_cause(&self) -> &AssetflowError {
        match self {
            AssetflowError::Task { inner, .. } => inner.root_cause(),
            other => other,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetflowError>;
