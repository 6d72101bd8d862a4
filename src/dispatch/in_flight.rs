// src/dispatch/in_flight.rs

use std::collections::HashSet;

use tracing::trace;

use crate::types::TaskId;

/// Ledger of tasks that were dispatched and have not completed yet.
///
/// Membership is checked before every insert, which is what keeps dispatch
/// idempotent: a task id can occupy at most one slot.
#[derive(Debug, Default, Clone)]
pub struct InFlightSet {
    tasks: HashSet<TaskId>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks currently in flight.
    pub fn size(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, task: &str) -> bool {
        self.tasks.contains(task)
    }

    /// Add `task` unless it is already in flight.
    ///
    /// Returns `true` if the task was added.
    pub fn enqueue_if_absent(&mut self, task: &str) -> bool {
        if self.tasks.contains(task) {
            trace!(task = %task, "already in flight; not enqueued");
            return false;
        }
        self.tasks.insert(task.to_string());
        true
    }

    /// Remove `task` on completion. Returns `true` if it was in flight.
    pub fn remove(&mut self, task: &str) -> bool {
        self.tasks.remove(task)
    }

    /// In-flight task ids, sorted.
    pub fn task_ids(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self.tasks.iter().cloned().collect();
        ids.sort();
        ids
    }
}
