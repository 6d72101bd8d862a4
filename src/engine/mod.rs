// src/engine/mod.rs

//! Reference execution driver.
//!
//! The scheduling functions in [`crate::dag`] and [`crate::dispatch`] are
//! pure; this module is the loop around them that a real deployment needs:
//! - [`run_store`] is the single-writer ledger of [`TaskRunState`]s.
//! - [`core`] is a synchronous state machine: tick, fold completions, report
//!   progress. No Tokio, no channels.
//! - [`runtime`] is the async shell that feeds dispatched tasks to an
//!   [`ExecutorBackend`](crate::exec::ExecutorBackend) and waits for
//!   completions or retry backoff.
//! - [`shutdown`] turns Ctrl-C into a shutdown request.

use chrono::{DateTime, Utc};

use crate::dag::TaskRunState;
use crate::types::{ExecutionId, TaskId};

pub mod core;
pub mod run_store;
pub mod runtime;
pub mod shutdown;

pub use core::CoreRuntime;
pub use run_store::RunStateStore;
pub use runtime::{Runtime, RuntimeOptions};
pub use shutdown::ShutdownListener;

/// Result of one attempt of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed(String),
}

impl TaskOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        TaskOutcome::Failed(reason.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success)
    }
}

/// A task handed to the executor for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedTask {
    pub execution: ExecutionId,
    pub task_id: TaskId,
    pub task_type: String,
    /// 1-based number of this attempt.
    pub attempt: u32,
}

/// Events flowing into the runtime from executors and signal handlers.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// An attempt of `task` finished.
    TaskCompleted { task: TaskId, outcome: TaskOutcome },
    /// Stop driving the execution; in-flight tasks are abandoned.
    ShutdownRequested,
}

/// Where an execution stands at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionProgress {
    /// Something is in flight or runnable right now.
    Running,
    /// Only failed tasks waiting out their backoff remain.
    WaitingForRetry { until: DateTime<Utc> },
    /// Every task succeeded.
    Succeeded,
    /// Nothing can run any more.
    Failed {
        /// Failed tasks with no attempts left.
        exhausted: Vec<TaskId>,
        /// Tasks that never ran because an upstream task is exhausted.
        blocked: Vec<TaskId>,
    },
}

/// Final status of a driven execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Succeeded,
    Failed {
        exhausted: Vec<TaskId>,
        blocked: Vec<TaskId>,
    },
    /// Stopped by shutdown or because the event channel closed.
    Cancelled,
}

/// Summary returned by [`Runtime::run`].
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub execution: ExecutionId,
    pub outcome: ExecutionOutcome,
    /// Final run state of every task, in declaration order.
    pub states: Vec<TaskRunState>,
}

impl ExecutionReport {
    pub fn succeeded(&self) -> bool {
        self.outcome == ExecutionOutcome::Succeeded
    }

    pub fn state_of(&self, task: &str) -> Option<&TaskRunState> {
        self.states.iter().find(|s| s.task_id == task)
    }
}
