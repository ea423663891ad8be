// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::engine::queue::TriggerQueues;
use crate::engine::{RuntimeOptions, ScheduledTask, TaskName, TaskOutcome, TriggerReason};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// Request that the process exits (used when `exit_when_idle` is set).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn continue_with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Handle a task trigger event.
///
/// - An idle task is dispatched immediately and marked running.
/// - A running task never gets a second concurrent invocation; the trigger
///   is recorded in its queue and replayed on completion.
pub fn handle_task_trigger(
    running: &mut HashSet<TaskName>,
    queues: &mut TriggerQueues,
    task: TaskName,
    reason: TriggerReason,
) -> CoreStep {
    if running.contains(&task) {
        queues.record_trigger(&task, reason);
        return CoreStep::continue_with(Vec::new());
    }

    debug!(task = %task, ?reason, "dispatching idle task");
    running.insert(task.clone());
    CoreStep::continue_with(vec![CoreCommand::DispatchTasks(vec![ScheduledTask {
        name: task,
        reason,
    }])])
}

/// Handle a task completion event.
pub fn handle_task_completion(
    running: &mut HashSet<TaskName>,
    queues: &mut TriggerQueues,
    options: &RuntimeOptions,
    task: TaskName,
    outcome: TaskOutcome,
) -> CoreStep {
    if !running.remove(&task) {
        warn!(task = %task, "completion for a task that was not running; ignoring");
    }
    if let TaskOutcome::Failed(ref err) = outcome {
        debug!(task = %task, error = %err, "task completed with failure");
    }

    let mut commands = Vec::new();

    if let Some(reason) = queues.take_next(&task) {
        debug!(task = %task, ?reason, "replaying queued trigger");
        running.insert(task.clone());
        commands.push(CoreCommand::DispatchTasks(vec![ScheduledTask {
            name: task,
            reason,
        }]));
    }

    let mut keep_running = true;
    if options.exit_when_idle && running.is_empty() && queues.is_empty() {
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}
