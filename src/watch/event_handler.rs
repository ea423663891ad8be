// src/watch/event_handler.rs

//! Turns one changed path into task triggers or a live reload.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::fs::FileSystem;
use crate::notifier::Notifier;
use crate::types::TaskName;
use crate::watch::hash::{compute_hash_for_files, HashStore};
use crate::watch::path_utils::relative_str;
use crate::watch::rules::CompiledRule;

/// Everything the event handler needs, shared by every event.
#[derive(Clone)]
pub struct WatchContext {
    /// Directory the rule globs are relative to.
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub rules: Arc<Vec<CompiledRule>>,
    pub notifier: Arc<dyn Notifier>,
    pub runtime_tx: mpsc::Sender<RuntimeEvent>,
    pub hash_store: Arc<Mutex<Box<dyn HashStore>>>,
}

impl std::fmt::Debug for WatchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchContext")
            .field("root", &self.root)
            .field("rules", &self.rules.len())
            .finish_non_exhaustive()
    }
}

/// Process a single file change.
///
/// 1. Find every rule whose globs select the path.
/// 2. Drop `use_hash` rules whose content hash is unchanged.
/// 3. Reload-only rules notify live clients directly.
/// 4. Every other rule triggers each of its tasks (once per event, even
///    when several rules name the same task).
///
/// Returns `false` once the runtime channel is closed.
pub async fn process_file_change(ctx: &WatchContext, path: &Path) -> bool {
    let Some(rel) = relative_str(&ctx.root, path) else {
        warn!("could not relativize path {:?} against root {:?}", path, ctx.root);
        return true;
    };

    let matching: Vec<&CompiledRule> = ctx.rules.iter().filter(|r| r.matches(&rel)).collect();
    if matching.is_empty() {
        return true;
    }
    debug!(path = %rel, rules = matching.len(), "watch rules matched");

    let mut reload = false;
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut triggers: Vec<TaskName> = Vec::new();

    for rule in matching {
        if rule.rule().use_hash && !content_changed(ctx, rule, &rel).await {
            continue;
        }
        if rule.rule().reload_only {
            reload = true;
            continue;
        }
        for task in &rule.rule().tasks {
            if seen.insert(task.as_str()) {
                triggers.push(task.clone());
            }
        }
    }

    if reload {
        info!(path = %rel, "reload-only change");
        ctx.notifier.reload(&[path.to_path_buf()]);
    }

    for task in triggers {
        debug!(task = %task, path = %rel, "watch match -> triggering task");
        if let Err(err) = ctx
            .runtime_tx
            .send(RuntimeEvent::TaskTriggered {
                task,
                reason: TriggerReason::FileWatch,
            })
            .await
        {
            warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
            return false;
        }
    }
    true
}

/// Whether the rule's combined content hash moved. Any failure counts as
/// changed.
async fn content_changed(ctx: &WatchContext, rule: &CompiledRule, rel_path: &str) -> bool {
    let key = rule.key();
    let spec = rule.spec().clone();
    let fs = Arc::clone(&ctx.fs);
    let root = ctx.root.clone();
    let store = Arc::clone(&ctx.hash_store);
    let rel_path = rel_path.to_string();

    tokio::task::spawn_blocking(move || {
        let files = match spec.collect(fs.as_ref(), &root) {
            Ok(files) => files,
            Err(err) => {
                warn!(rule = %key, error = %err, "failed to collect watched files; triggering anyway");
                return true;
            }
        };
        let new_hash = compute_hash_for_files(&files);

        let mut store = match store.lock() {
            Ok(guard) => guard,
            Err(_poisoned) => {
                warn!(rule = %key, "hash store mutex poisoned; triggering anyway");
                return true;
            }
        };

        match store.load(&key) {
            Ok(Some(old)) if old == new_hash => {
                info!(rule = %key, path = %rel_path, "content unchanged; skipping");
                false
            }
            Ok(_) => {
                if let Err(err) = store.save(&key, &new_hash) {
                    warn!(rule = %key, error = %err, "failed to save rule hash");
                }
                true
            }
            Err(err) => {
                warn!(rule = %key, error = %err, "failed to load rule hash; triggering anyway");
                true
            }
        }
    })
    .await
    .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::notifier::NoopNotifier;
    use crate::watch::hash::MemoryHashStore;
    use crate::watch::rules::{compile_rules, WatchRule};

    fn context(fs: &MockFileSystem, rules: Vec<WatchRule>) -> (WatchContext, mpsc::Receiver<RuntimeEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let store: Box<dyn HashStore> = Box::new(MemoryHashStore::default());
        let ctx = WatchContext {
            root: PathBuf::from("."),
            fs: Arc::new(fs.clone()),
            rules: Arc::new(compile_rules(&rules).unwrap()),
            notifier: Arc::new(NoopNotifier),
            runtime_tx: tx,
            hash_store: Arc::new(Mutex::new(store)),
        };
        (ctx, rx)
    }

    fn triggered(rx: &mut mpsc::Receiver<RuntimeEvent>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let RuntimeEvent::TaskTriggered { task, .. } = event {
                out.push(task);
            }
        }
        out
    }

    #[tokio::test]
    async fn overlapping_rules_trigger_each_task_once() {
        let fs = MockFileSystem::new();
        let (ctx, mut rx) = context(
            &fs,
            vec![
                WatchRule::run(["app/components/*"], ["pages"]),
                WatchRule::run(["app/**/*.html"], ["pages", "copy"]),
            ],
        );

        assert!(process_file_change(&ctx, Path::new("app/components/head.html")).await);
        assert_eq!(triggered(&mut rx), vec!["pages", "copy"]);
    }

    #[tokio::test]
    async fn hashed_rule_skips_unchanged_content() {
        let fs = MockFileSystem::new();
        fs.add_file("app/js/main.js", "let a = 1;");
        let (ctx, mut rx) = context(&fs, vec![WatchRule::run(["app/js/main.js"], ["scripts"]).with_hash()]);
        let path = Path::new("app/js/main.js");

        process_file_change(&ctx, path).await;
        process_file_change(&ctx, path).await;
        assert_eq!(triggered(&mut rx), vec!["scripts"]);

        fs.add_file("app/js/main.js", "let a = 2;");
        process_file_change(&ctx, path).await;
        assert_eq!(triggered(&mut rx), vec!["scripts"]);
    }
}
