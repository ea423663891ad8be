use std::str::FromStr;

use serde::Deserialize;

/// Canonical task name type.
pub type TaskName = String;

/// Behaviour when a watch rule fires for a task that is still running.
///
/// - `Queue`: remember the trigger and re-run the task once the current
///   invocation finishes (default behaviour).
/// - `Cancel`: drop anything queued earlier and keep only the latest
///   trigger. The running invocation itself is never interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Cancel,
}

impl FromStr for TriggerWhileRunningBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(TriggerWhileRunningBehaviour::Queue),
            "cancel" => Ok(TriggerWhileRunningBehaviour::Cancel),
            other => Err(format!(
                "invalid triggered_while_running_behaviour: {other} (expected \"queue\" or \"cancel\")"
            )),
        }
    }
}

/// Mode for storing watch rule content hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashStorageMode {
    /// Store hashes in a file (`.assetflow/hashes`).
    File,
    /// Store hashes in memory only (lost on restart).
    #[default]
    Memory,
}

/// How the members of a composite task are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionMode {
    /// All members start immediately; completion waits for all of them.
    Parallel,
    /// Each member starts only after the previous one succeeded.
    Series,
}
