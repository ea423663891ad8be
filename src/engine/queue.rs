// src/engine/queue.rs

use std::collections::{HashMap, VecDeque};

use tracing::{debug, warn};

use super::{TaskName, TriggerReason};
use crate::types::TriggerWhileRunningBehaviour;

/// Triggers that arrived for one task while it was running.
///
/// Semantics:
/// - `Queue`: each trigger is remembered as one future re-run. At most
///   `max_runs` re-runs are kept; the oldest are dropped beyond that. With
///   the default `queue_length = 1`, any number of triggers during a run
///   coalesce into a single re-run.
/// - `Cancel`: only the latest trigger is kept. The running invocation is
///   never interrupted.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    max_runs: usize,
    runs: VecDeque<TriggerReason>,
}

impl TriggerQueue {
    /// `max_runs` is clamped to at least 1.
    pub fn new(behaviour: TriggerWhileRunningBehaviour, max_runs: usize) -> Self {
        Self {
            behaviour,
            max_runs: max_runs.max(1),
            runs: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn behaviour(&self) -> TriggerWhileRunningBehaviour {
        self.behaviour
    }

    /// Record that the task was triggered while running.
    pub fn record_trigger(&mut self, reason: TriggerReason) {
        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                self.runs.push_back(reason);
                if self.runs.len() > self.max_runs {
                    warn!(
                        queued = self.runs.len(),
                        max_runs = self.max_runs,
                        "exceeded queue_length; dropping oldest queued run"
                    );
                    while self.runs.len() > self.max_runs {
                        self.runs.pop_front();
                    }
                }
            }
            TriggerWhileRunningBehaviour::Cancel => {
                self.runs.clear();
                self.runs.push_back(reason);
            }
        }
    }

    /// Next queued run, oldest first.
    pub fn take_next(&mut self) -> Option<TriggerReason> {
        self.runs.pop_front()
    }
}

/// One [`TriggerQueue`] per task name, created on demand.
#[derive(Debug)]
pub struct TriggerQueues {
    behaviour: TriggerWhileRunningBehaviour,
    max_runs: usize,
    by_task: HashMap<TaskName, TriggerQueue>,
}

impl TriggerQueues {
    pub fn new(behaviour: TriggerWhileRunningBehaviour, max_runs: usize) -> Self {
        Self {
            behaviour,
            max_runs,
            by_task: HashMap::new(),
        }
    }

    pub fn record_trigger(&mut self, task: &str, reason: TriggerReason) {
        let (behaviour, max_runs) = (self.behaviour, self.max_runs);
        let queue = self
            .by_task
            .entry(task.to_string())
            .or_insert_with(|| TriggerQueue::new(behaviour, max_runs));
        queue.record_trigger(reason);
        debug!(task, queued = queue.len(), ?behaviour, "task busy; trigger queued");
    }

    pub fn take_next(&mut self, task: &str) -> Option<TriggerReason> {
        let queue = self.by_task.get_mut(task)?;
        let next = queue.take_next();
        if queue.is_empty() {
            self.by_task.remove(task);
        }
        next
    }

    pub fn pending_for(&self, task: &str) -> usize {
        self.by_task.get(task).map_or(0, TriggerQueue::len)
    }

    pub fn is_empty(&self) -> bool {
        self.by_task.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_mode_keeps_at_most_max_runs() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 2);
        q.record_trigger(TriggerReason::Manual);
        q.record_trigger(TriggerReason::FileWatch);
        q.record_trigger(TriggerReason::FileWatch);
        assert_eq!(q.len(), 2);
        assert_eq!(q.take_next(), Some(TriggerReason::FileWatch));
    }

    #[test]
    fn cancel_mode_keeps_only_the_latest() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Cancel, 5);
        q.record_trigger(TriggerReason::FileWatch);
        q.record_trigger(TriggerReason::Manual);
        assert_eq!(q.len(), 1);
        assert_eq!(q.take_next(), Some(TriggerReason::Manual));
        assert!(q.is_empty());
    }

    #[test]
    fn zero_length_is_clamped() {
        let mut queues = TriggerQueues::new(TriggerWhileRunningBehaviour::Queue, 0);
        queues.record_trigger("styles", TriggerReason::FileWatch);
        queues.record_trigger("styles", TriggerReason::FileWatch);
        assert_eq!(queues.pending_for("styles"), 1);
        assert!(queues.take_next("styles").is_some());
        assert!(queues.is_empty());
    }
}
