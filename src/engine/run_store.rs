// src/engine/run_store.rs

//! Driver-owned run state for one execution.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::dag::{TaskRunState, WorkflowGraph};
use crate::engine::TaskOutcome;
use crate::errors::{FlowdagError, Result};
use crate::types::{TaskId, TaskStatus};

/// Ledger of [`TaskRunState`]s, one per task, in declaration order.
///
/// This is the only place run state is written. The scheduler reads it
/// through [`RunStateStore::snapshot`].
#[derive(Debug, Clone)]
pub struct RunStateStore {
    states: Vec<TaskRunState>,
    backoff: Vec<Option<u64>>,
    index: HashMap<TaskId, usize>,
}

impl RunStateStore {
    /// Seed a pending state for every task of `graph`.
    pub fn from_graph(graph: &WorkflowGraph) -> Self {
        let mut states = Vec::with_capacity(graph.len());
        let mut backoff = Vec::with_capacity(graph.len());
        let mut index = HashMap::with_capacity(graph.len());

        for (i, node) in graph.nodes().enumerate() {
            let task = node.task();
            states.push(TaskRunState::pending(task.id.clone(), task.max_attempts()));
            backoff.push(task.retry.and_then(|r| r.backoff_seconds));
            index.insert(task.id.clone(), i);
        }

        Self {
            states,
            backoff,
            index,
        }
    }

    pub fn snapshot(&self) -> &[TaskRunState] {
        &self.states
    }

    pub fn get(&self, task: &str) -> Option<&TaskRunState> {
        self.index.get(task).map(|&i| &self.states[i])
    }

    /// Record that `task` was handed to the executor at `now`.
    ///
    /// Returns the 1-based number of the attempt being started.
    pub fn record_dispatched(&mut self, task: &str, now: DateTime<Utc>) -> Result<u32> {
        let i = self.position(task)?;
        let state = &mut self.states[i];

        state.status = TaskStatus::Running;
        state.started_at = Some(now);
        state.completed_at = None;
        state.next_eligible_at = None;

        Ok(state.attempt_count + 1)
    }

    /// Fold the outcome of a finished attempt into the task's state.
    pub fn record_outcome(
        &mut self,
        task: &str,
        outcome: &TaskOutcome,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let i = self.position(task)?;
        let backoff = self.backoff[i];
        let state = &mut self.states[i];

        state.attempt_count += 1;
        state.completed_at = Some(now);

        match outcome {
            TaskOutcome::Success => {
                state.status = TaskStatus::Success;
                state.next_eligible_at = None;
            }
            TaskOutcome::Failed(reason) => {
                state.status = TaskStatus::Failed;
                let exhausted = state.attempts_exhausted();
                state.next_eligible_at = backoff
                    .filter(|_| !exhausted)
                    .and_then(|secs| i64::try_from(secs).ok())
                    .and_then(Duration::try_seconds)
                    .and_then(|delay| now.checked_add_signed(delay));
                debug!(
                    task = %task,
                    attempt = state.attempt_count,
                    max_attempts = state.max_attempts,
                    next_eligible_at = ?state.next_eligible_at,
                    reason = %reason,
                    "attempt failed"
                );
            }
        }

        Ok(())
    }

    fn position(&self, task: &str) -> Result<usize> {
        self.index
            .get(task)
            .copied()
            .ok_or_else(|| FlowdagError::TaskNotFound(task.to_string()))
    }
}
