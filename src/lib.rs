// src/lib.rs

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fileset;
pub mod fs;
pub mod logging;
pub mod notifier;
pub mod pipeline;
pub mod registry;
pub mod transform;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_or_default;
use crate::config::model::ConfigFile;
use crate::fs::RealFileSystem;
use crate::notifier::LiveReload;
use crate::registry::{BuildContext, Runner, Task};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (or the built-in layout)
/// - the build context (filesystem, live reload, watch settings)
/// - the task runner
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_or_default(&config_path)?;
    let task = args.task_name();

    if args.dry_run {
        print_dry_run(&cfg, task);
        return Ok(());
    }

    // Fail before doing any work when the task does not exist.
    cfg.registry.get(task)?;

    let mut ctx = BuildContext::new(config_root_dir(&config_path), Arc::new(RealFileSystem))
        .with_watch(cfg.watch_settings());

    // Only sessions that start a dev server have anybody to reload.
    if cfg
        .registry
        .closure_contains(task, |t| matches!(t, Task::Serve(_)))
    {
        ctx = ctx.with_live_reload(LiveReload::default());
    }

    let interactive = cfg.registry.closure_contains(task, Task::is_long_running);
    let runner = Runner::new(cfg.registry, ctx);
    info!(task, interactive, "running task");

    tokio::select! {
        res = runner.run(task) => res?,
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("interrupted; shutting down");
        }
    }
    Ok(())
}

/// Project root: the directory holding the config file, or `.` for a bare
/// file name.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Print the registry, the selected task and the watch rules.
fn print_dry_run(cfg: &ConfigFile, selected: &str) {
    println!("assetflow dry-run");
    println!("  config.source_root = {:?}", cfg.config.source_root);
    println!(
        "  config.triggered_while_running_behaviour = {:?}",
        cfg.config.triggered_while_running_behaviour
    );
    println!("  config.queue_length = {}", cfg.config.queue_length);
    println!("  config.hash_storage_mode = {:?}", cfg.config.hash_storage_mode);
    println!("  selected task = {selected}");
    println!();

    println!("tasks ({}):", cfg.registry.names().count());
    for (name, task) in cfg.registry.iter() {
        println!("  - {name} ({})", task.kind());
        if !task.members().is_empty() {
            println!("      members: {:?}", task.members());
        }
        if let Ok(Some(pipeline)) = task.pipeline() {
            for stage in pipeline.stages() {
                println!("      {stage:?}");
            }
        }
    }

    let rules = cfg.registry.watch_rules();
    if !rules.is_empty() {
        println!();
        println!("watch rules ({}):", rules.len());
        for rule in rules {
            if rule.reload_only {
                println!("  - {:?} -> reload", rule.paths);
            } else {
                println!("  - {:?} -> {:?}", rule.paths, rule.tasks);
            }
            if rule.use_hash {
                println!("      use_hash: true");
            }
        }
    }

    debug!("dry-run complete (no execution)");
}
