// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::ExecutorBackend;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent, ScheduledTask, TaskOutcome, TriggerReason};

/// Counters for one watch session, reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Task invocations that finished.
    pub runs: usize,
    /// Of those, how many failed.
    pub failures: usize,
    /// Triggers that arrived while their task was running.
    pub coalesced: usize,
}

/// Async shell around [`CoreRuntime`]: reads events, applies them to the
/// core, and hands dispatched tasks to an [`ExecutorBackend`].
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    summary: SessionSummary,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
            summary: SessionSummary::default(),
        }
    }

    /// Process events until the channel closes, shutdown is requested, or
    /// (with `exit_when_idle`) nothing is running or queued.
    pub async fn run(mut self) -> Result<SessionSummary> {
        debug!("runtime started");

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "runtime event");
            self.record(&event);

            let step = self.core.step(event);
            for command in step.commands {
                match command {
                    CoreCommand::DispatchTasks(tasks) => self.dispatch(tasks).await?,
                    CoreCommand::RequestExit => debug!("idle; exit requested"),
                }
            }

            if !step.keep_running {
                break;
            }
        }

        let summary = self.summary;
        info!(
            runs = summary.runs,
            failures = summary.failures,
            coalesced = summary.coalesced,
            "watch session finished"
        );
        Ok(summary)
    }

    fn record(&mut self, event: &RuntimeEvent) {
        match event {
            RuntimeEvent::TaskTriggered { task, .. } if self.core.is_running(task) => {
                self.summary.coalesced += 1;
                debug!(task = %task, "task busy; trigger queued");
            }
            RuntimeEvent::TaskCompleted { task, outcome } => {
                self.summary.runs += 1;
                if let TaskOutcome::Failed(err) = outcome {
                    self.summary.failures += 1;
                    debug!(task = %task, error = %err, "counted failure");
                }
            }
            RuntimeEvent::ShutdownRequested => info!("shutdown requested"),
            RuntimeEvent::TaskTriggered { .. } => {}
        }
    }

    async fn dispatch(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }
        for task in &tasks {
            match task.reason {
                TriggerReason::FileWatch => info!(task = %task.name, "change detected; rebuilding"),
                TriggerReason::Manual => debug!(task = %task.name, "running"),
            }
        }
        self.executor.spawn_ready_tasks(tasks).await
    }
}
