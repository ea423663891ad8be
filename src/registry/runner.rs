// src/registry/runner.rs

//! Executes registry tasks.
//!
//! Everything a task needs (project root, filesystem, notifier, watch
//! settings) comes from the [`BuildContext`] handed to [`Runner::new`].

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::aggregate::{self, ArtifactSet};
use crate::errors::{AssetflowError, Result};
use crate::fileset::join_root;
use crate::fs::FileSystem;
use crate::notifier::server::ServeOptions;
use crate::notifier::{spawn_server, LiveReload, NoopNotifier, Notifier};
use crate::pipeline::{blocking, PipelineContext};
use crate::types::{CompositionMode, HashStorageMode, TaskName, TriggerWhileRunningBehaviour};

use super::{AggregateTask, Registry, ServeTask, Task};

/// Future returned by [`Runner::run`].
pub type TaskFuture = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

/// `[config]` values that only matter to the watch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSettings {
    /// Root-relative directory the filesystem watcher subscribes to.
    pub source_root: PathBuf,
    pub behaviour: TriggerWhileRunningBehaviour,
    pub queue_length: usize,
    pub hash_storage_mode: HashStorageMode,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("app"),
            behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: 1,
            hash_storage_mode: HashStorageMode::default(),
        }
    }
}

/// Shared state for one invocation of the tool.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Directory every configured path is relative to.
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub notifier: Arc<dyn Notifier>,
    /// Present when a dev server may be started; the server subscribes to
    /// the same broadcast that `notifier` publishes on.
    pub live: Option<LiveReload>,
    pub watch: WatchSettings,
}

impl BuildContext {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
            notifier: Arc::new(NoopNotifier),
            live: None,
            watch: WatchSettings::default(),
        }
    }

    pub fn with_live_reload(mut self, live: LiveReload) -> Self {
        self.notifier = Arc::new(live.clone());
        self.live = Some(live);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_watch(mut self, watch: WatchSettings) -> Self {
        self.watch = watch;
        self
    }

    pub fn pipeline_context(&self) -> PipelineContext {
        PipelineContext {
            root: self.root.clone(),
            fs: Arc::clone(&self.fs),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

#[derive(Debug)]
pub struct Runner {
    registry: Arc<Registry>,
    ctx: BuildContext,
}

impl Runner {
    pub fn new(registry: Registry, ctx: BuildContext) -> Arc<Self> {
        Arc::new(Self {
            registry: Arc::new(registry),
            ctx,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    /// Run a task by name.
    ///
    /// Errors carry the name of the innermost failing task.
    pub fn run(self: &Arc<Self>, name: &str) -> TaskFuture {
        let runner = Arc::clone(self);
        let name = name.to_string();

        Box::pin(async move {
            let task = runner.registry.get(&name)?.clone();
            info!(task = %name, kind = task.kind(), "starting task");
            let started = Instant::now();

            match runner.execute(task).await {
                Ok(()) => {
                    info!(
                        task = %name,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "finished task"
                    );
                    Ok(())
                }
                Err(err) => Err(err.in_task(&name)),
            }
        })
    }

    async fn execute(self: Arc<Self>, task: Task) -> Result<()> {
        match task {
            Task::Compile(_) | Task::Bundle(_) | Task::Convert(_) => self.run_pipeline(&task).await,
            Task::Aggregate(AggregateTask::Clean(clean)) => {
                let (fs, root) = (Arc::clone(&self.ctx.fs), self.ctx.root.clone());
                blocking(move || aggregate::clean(fs.as_ref(), &root, &clean.dir).map(|_| ())).await
            }
            Task::Aggregate(AggregateTask::Copy(copy)) => {
                let artifacts = ArtifactSet::new(&copy.base, &copy.artifacts)?;
                let (fs, root) = (Arc::clone(&self.ctx.fs), self.ctx.root.clone());
                blocking(move || artifacts.copy(fs.as_ref(), &root, &copy.dest).map(|_| ())).await
            }
            Task::Serve(serve) => self.serve(serve).await,
            Task::Watch => crate::watch::run_watch_loop(Arc::clone(&self)).await,
            Task::Composite {
                mode: CompositionMode::Parallel,
                tasks,
            } => self.run_parallel(tasks).await,
            Task::Composite {
                mode: CompositionMode::Series,
                tasks,
            } => self.run_series(tasks).await,
        }
    }

    async fn run_pipeline(&self, task: &Task) -> Result<()> {
        let Some(pipeline) = task.pipeline()? else {
            return Ok(());
        };
        let written = pipeline.run(&self.ctx.pipeline_context()).await?;
        debug!(written = written.len(), "pipeline complete");
        Ok(())
    }

    /// Start every member at once. Returns after all of them succeeded or
    /// at the first failure; remaining members keep running detached.
    async fn run_parallel(self: &Arc<Self>, members: Vec<TaskName>) -> Result<()> {
        let mut set = JoinSet::new();
        for member in &members {
            set.spawn(self.run(member));
        }

        while let Some(joined) = set.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(join_err) => Err(AssetflowError::Other(anyhow::anyhow!(
                    "parallel member panicked: {join_err}"
                ))),
            };
            if let Err(err) = outcome {
                if !set.is_empty() {
                    warn!(remaining = set.len(), "parallel member failed; detaching the rest");
                }
                set.detach_all();
                return Err(err);
            }
        }
        Ok(())
    }

    async fn run_series(self: &Arc<Self>, members: Vec<TaskName>) -> Result<()> {
        for member in &members {
            self.run(member).await?;
        }
        Ok(())
    }

    async fn serve(&self, task: ServeTask) -> Result<()> {
        let live = match &self.ctx.live {
            Some(live) => live.clone(),
            None => {
                debug!("serving without a live reload source");
                LiveReload::default()
            }
        };
        let options = ServeOptions {
            root: join_root(&self.ctx.root, &task.root),
            host: task.host,
            port: task.port,
        };
        let handle = spawn_server(options, live).await?;
        handle.wait().await?;
        Ok(())
    }
}
