// src/dag/run_state.rs

//! Per-task run state as observed by the scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{TaskId, TaskStatus};

/// Latest known state of one task in one execution.
///
/// The execution driver is the only writer; the scheduling functions take a
/// snapshot of these records and never modify them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRunState {
    pub task_id: TaskId,
    pub status: TaskStatus,
    /// Attempts already made.
    pub attempt_count: u32,
    pub max_attempts: u32,
    /// Earliest instant a failed task may be retried.
    #[serde(default)]
    pub next_eligible_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskRunState {
    /// Fresh state for a task that has not been attempted yet.
    pub fn pending(task_id: impl Into<TaskId>, max_attempts: u32) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Pending,
            attempt_count: 0,
            max_attempts,
            next_eligible_at: None,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_attempts(mut self, attempt_count: u32) -> Self {
        self.attempt_count = attempt_count;
        self
    }

    pub fn with_next_eligible_at(mut self, at: DateTime<Utc>) -> Self {
        self.next_eligible_at = Some(at);
        self
    }

    /// `true` once no further attempt is allowed.
    pub fn attempts_exhausted(&self) -> bool {
        self.attempt_count >= self.max_attempts
    }

    /// Whether a failed task may be attempted again at `now`.
    pub fn retry_eligible(&self, now: DateTime<Utc>) -> bool {
        self.status == TaskStatus::Failed
            && !self.attempts_exhausted()
            && self.next_eligible_at.is_none_or(|at| at <= now)
    }
}
