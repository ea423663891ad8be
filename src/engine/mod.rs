// src/engine/mod.rs

//! Orchestration engine for the watch loop.
//!
//! This module ties together:
//! - per-task run state (a task is either idle or running)
//! - the trigger queue (what happens when a trigger arrives for a task that
//!   is still running)
//! - the main runtime event loop that reacts to file-watch triggers, task
//!   completions and shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

pub use crate::types::TaskName;

/// Outcome of one task invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// The task failed; carries the rendered error.
    Failed(String),
}

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Explicit trigger (e.g. a test or an initial run).
    Manual,
    /// Triggered due to a filesystem event matching a watch rule.
    FileWatch,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// If true, exit the runtime once nothing is running and nothing is
    /// queued.
    pub exit_when_idle: bool,
}

/// A task the core wants started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub reason: TriggerReason,
}

/// Events flowing into the runtime from the watcher, the executor, etc.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A task should be run.
    TaskTriggered {
        task: TaskName,
        reason: TriggerReason,
    },
    /// A task invocation finished.
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::{TriggerQueue, TriggerQueues};
pub use crate::types::TriggerWhileRunningBehaviour;
pub use runtime::{Runtime, SessionSummary};
