// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Name of the task run when none is given on the command line.
pub const DEFAULT_TASK: &str = "default";

/// Command-line arguments for `assetflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetflow",
    version,
    about = "Build static assets (styles, scripts, images, fonts, sprites, pages) and watch for changes.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run. Without one, the `default` composition runs
    /// (compile styles and scripts, serve, watch).
    #[arg(value_name = "TASK")]
    pub task: Option<String>,

    /// Path to the config file (TOML).
    ///
    /// When the default path does not exist the built-in `app/` -> `dist/`
    /// layout is used.
    #[arg(long, value_name = "PATH", default_value = crate::config::loader::DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load and validate the config, print the task registry, run nothing.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// The task selected on the command line, or `default`.
    pub fn task_name(&self) -> &str {
        self.task.as_deref().unwrap_or(DEFAULT_TASK)
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
