// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling `[[watch]]` rules into glob matchers.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Optionally hashing rule contents so unchanged files fire nothing.
//! - Running the watch loop: watcher -> core runtime -> task runner.

pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod rules;
pub mod watcher;

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use crate::errors::{AssetflowError, Result};
use crate::exec::RegistryExecutor;
use crate::fileset::join_root;
use crate::registry::Runner;

pub use event_handler::{process_file_change, WatchContext};
pub use hash::{build_hash_store, compute_hash_for_files, FileHashStore, HashStore, MemoryHashStore, HASH_FILE_PATH};
pub use rules::{compile_rules, CompiledRule, WatchRule};
pub use watcher::{spawn_watcher, WatcherHandle};

/// Watch the source tree and rebuild on change until interrupted.
///
/// Task failures are logged and the loop keeps going.
pub async fn run_watch_loop(runner: Arc<Runner>) -> Result<()> {
    let ctx = runner.context();
    let settings = ctx.watch.clone();

    let rules = compile_rules(runner.registry().watch_rules())?;
    if rules.is_empty() {
        warn!("no [[watch]] rules configured; the watcher will only idle");
    }

    let root = ctx.root.canonicalize().unwrap_or_else(|_| ctx.root.clone());
    let watch_dir = join_root(&root, &settings.source_root);

    let mut hash_store = build_hash_store(settings.hash_storage_mode, &root, Arc::clone(&ctx.fs));
    let active: Vec<String> = rules.iter().map(CompiledRule::key).collect();
    if let Err(e) = hash_store.prune(&active) {
        warn!("failed to prune stale hashes: {e}");
    }

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let watch_ctx = WatchContext {
        root,
        fs: Arc::clone(&ctx.fs),
        rules: Arc::new(rules),
        notifier: Arc::clone(&ctx.notifier),
        runtime_tx: rt_tx.clone(),
        hash_store: Arc::new(Mutex::new(hash_store)),
    };
    let _watcher = spawn_watcher(watch_ctx, &watch_dir)
        .map_err(|e| AssetflowError::filesystem(&watch_dir, e))?;

    let core = CoreRuntime::new(
        settings.behaviour,
        settings.queue_length,
        RuntimeOptions::default(),
    );
    let executor = RegistryExecutor::new(Arc::clone(&runner), rt_tx);

    info!(dir = ?watch_dir, "watching for changes");
    Runtime::new(core, rt_rx, executor).run().await?;
    Ok(())
}
