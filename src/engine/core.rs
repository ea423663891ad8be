// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Runtime`) reads events from channels
//! and hands dispatched tasks to the executor. The core can be unit tested
//! without any Tokio, channels, filesystem or pipelines.

use std::collections::HashSet;

use crate::engine::event_handlers::{handle_task_completion, handle_task_trigger, CoreStep};
use crate::engine::queue::TriggerQueues;
use crate::engine::{RuntimeEvent, RuntimeOptions, TaskName};
use crate::types::TriggerWhileRunningBehaviour;

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    running: HashSet<TaskName>,
    queues: TriggerQueues,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            running: HashSet::new(),
            queues: TriggerQueues::new(behaviour, queue_length),
            options,
        }
    }

    /// Nothing is running.
    pub fn is_idle(&self) -> bool {
        self.running.is_empty()
    }

    pub fn is_running(&self, task: &str) -> bool {
        self.running.contains(task)
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    pub fn pending_for(&self, task: &str) -> usize {
        self.queues.pending_for(task)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskTriggered { task, reason } => {
                handle_task_trigger(&mut self.running, &mut self.queues, task, reason)
            }
            RuntimeEvent::TaskCompleted { task, outcome } => handle_task_completion(
                &mut self.running,
                &mut self.queues,
                &self.options,
                task,
                outcome,
            ),
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CoreCommand, ScheduledTask, TaskOutcome, TriggerReason};

    fn trigger(task: &str) -> RuntimeEvent {
        RuntimeEvent::TaskTriggered {
            task: task.to_string(),
            reason: TriggerReason::FileWatch,
        }
    }

    fn done(task: &str) -> RuntimeEvent {
        RuntimeEvent::TaskCompleted {
            task: task.to_string(),
            outcome: TaskOutcome::Success,
        }
    }

    fn dispatched(step: &CoreStep) -> Vec<String> {
        step.commands
            .iter()
            .filter_map(|c| match c {
                CoreCommand::DispatchTasks(tasks) => Some(tasks),
                _ => None,
            })
            .flatten()
            .map(|t| t.name.clone())
            .collect()
    }

    #[test]
    fn triggers_while_running_coalesce_into_one_rerun() {
        let mut core = CoreRuntime::new(
            TriggerWhileRunningBehaviour::Queue,
            1,
            RuntimeOptions::default(),
        );

        assert_eq!(dispatched(&core.step(trigger("styles"))), vec!["styles"]);
        assert!(dispatched(&core.step(trigger("styles"))).is_empty());
        assert!(dispatched(&core.step(trigger("styles"))).is_empty());
        assert_eq!(core.pending_for("styles"), 1);

        assert_eq!(dispatched(&core.step(done("styles"))), vec!["styles"]);
        assert!(core.is_running("styles"));
        assert!(dispatched(&core.step(done("styles"))).is_empty());
        assert!(core.is_idle());
    }

    #[test]
    fn different_tasks_run_side_by_side() {
        let mut core = CoreRuntime::new(
            TriggerWhileRunningBehaviour::Queue,
            1,
            RuntimeOptions::default(),
        );
        assert_eq!(dispatched(&core.step(trigger("styles"))), vec!["styles"]);
        assert_eq!(dispatched(&core.step(trigger("scripts"))), vec!["scripts"]);
        assert!(core.queue_is_empty());
    }

    #[test]
    fn exit_when_idle_requests_exit_after_last_completion() {
        let mut core = CoreRuntime::new(
            TriggerWhileRunningBehaviour::Cancel,
            1,
            RuntimeOptions {
                exit_when_idle: true,
            },
        );
        core.step(trigger("pages"));
        let step = core.step(RuntimeEvent::TaskCompleted {
            task: "pages".into(),
            outcome: TaskOutcome::Failed("boom".into()),
        });
        assert!(!step.keep_running);
        assert_eq!(step.commands, vec![CoreCommand::RequestExit]);
    }

    #[test]
    fn replayed_run_keeps_the_queued_reason() {
        let mut core = CoreRuntime::new(
            TriggerWhileRunningBehaviour::Queue,
            1,
            RuntimeOptions::default(),
        );
        core.step(trigger("images"));
        core.step(RuntimeEvent::TaskTriggered {
            task: "images".into(),
            reason: TriggerReason::Manual,
        });
        let step = core.step(done("images"));
        assert_eq!(
            step.commands,
            vec![CoreCommand::DispatchTasks(vec![ScheduledTask {
                name: "images".into(),
                reason: TriggerReason::Manual,
            }])]
        );
    }
}
