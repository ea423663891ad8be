// src/exec/task_runner.rs

//! Single task invocation on behalf of the watch loop.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::engine::{RuntimeEvent, ScheduledTask, TaskOutcome};
use crate::registry::Runner;

/// Run one task and always emit exactly one `TaskCompleted` for it.
///
/// A failure is logged and reported as [`TaskOutcome::Failed`]; it never
/// ends the watch loop.
pub async fn run_and_report(
    runner: Arc<Runner>,
    task: ScheduledTask,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    info!(task = %task.name, reason = ?task.reason, "rebuilding");

    let outcome = match runner.run(&task.name).await {
        Ok(()) => TaskOutcome::Success,
        Err(err) => {
            error!(task = %task.name, error = %err, "task failed; still watching");
            TaskOutcome::Failed(err.to_string())
        }
    };

    if let Err(err) = runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.name,
            outcome,
        })
        .await
    {
        warn!("failed to send RuntimeEvent::TaskCompleted: {err}");
    }
}
