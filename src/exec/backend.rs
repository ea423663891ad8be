// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of running tasks
//! itself. Production uses [`RegistryExecutor`]; tests can provide a fake
//! that records scheduled tasks and emits `TaskCompleted` directly.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::engine::{RuntimeEvent, ScheduledTask};
use crate::errors::Result;
use crate::registry::Runner;

use super::task_runner::run_and_report;

/// Trait abstracting how scheduled tasks are executed.
pub trait ExecutorBackend: Send {
    /// Dispatch the given tasks for execution. Must not wait for them to
    /// finish; completion is reported back as a `RuntimeEvent`.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Runs dispatched tasks through the registry's [`Runner`].
#[derive(Debug, Clone)]
pub struct RegistryExecutor {
    runner: Arc<Runner>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl RegistryExecutor {
    pub fn new(runner: Arc<Runner>, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self { runner, runtime_tx }
    }
}

impl ExecutorBackend for RegistryExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let runner = Arc::clone(&self.runner);
        let tx = self.runtime_tx.clone();

        Box::pin(async move {
            for task in tasks {
                tokio::spawn(run_and_report(Arc::clone(&runner), task, tx.clone()));
            }
            Ok(())
        })
    }
}
