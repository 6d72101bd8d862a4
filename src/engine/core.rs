// src/engine/core.rs

//! Pure core of the execution driver.
//!
//! [`CoreRuntime`] owns one execution's graph and run state and a handle to
//! a (possibly shared) dispatcher. Each call is synchronous and takes `now`
//! explicitly, so the whole cycle can be unit tested without Tokio, clocks
//! or executors.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::dag::{select_runnable_tasks, TaskRunState, WorkflowGraph};
use crate::dispatch::{DispatchLimits, SharedDispatcher};
use crate::engine::run_store::RunStateStore;
use crate::engine::{DispatchedTask, ExecutionProgress, TaskOutcome};
use crate::errors::Result;
use crate::types::{ExecutionId, TaskId, TaskStatus};

#[derive(Debug)]
pub struct CoreRuntime {
    execution: ExecutionId,
    graph: WorkflowGraph,
    store: RunStateStore,
    dispatcher: SharedDispatcher,
    limits: DispatchLimits,
}

impl CoreRuntime {
    /// Core with a dispatcher of its own.
    pub fn new(
        execution: impl Into<ExecutionId>,
        graph: WorkflowGraph,
        limits: DispatchLimits,
    ) -> Self {
        Self::with_dispatcher(execution, graph, limits, SharedDispatcher::new())
    }

    /// Core that shares `dispatcher` (and thus the global ceiling) with
    /// other executions.
    pub fn with_dispatcher(
        execution: impl Into<ExecutionId>,
        graph: WorkflowGraph,
        limits: DispatchLimits,
        dispatcher: SharedDispatcher,
    ) -> Self {
        let store = RunStateStore::from_graph(&graph);
        Self {
            execution: execution.into(),
            graph,
            store,
            dispatcher,
            limits,
        }
    }

    pub fn execution_id(&self) -> &str {
        &self.execution
    }

    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    pub fn run_states(&self) -> &[TaskRunState] {
        self.store.snapshot()
    }

    pub fn run_state_of(&self, task: &str) -> Option<&TaskRunState> {
        self.store.get(task)
    }

    /// Tasks of this execution currently holding a dispatcher slot.
    pub fn in_flight(&self) -> usize {
        self.dispatcher.in_flight_for(&self.execution)
    }

    /// Select runnable tasks, dispatch up to capacity and mark the
    /// dispatched ones as running.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<Vec<DispatchedTask>> {
        let runnable = select_runnable_tasks(&self.graph, self.store.snapshot(), now);
        if runnable.is_empty() {
            return Ok(Vec::new());
        }

        let dispatched = self.dispatcher.tick(&self.execution, &runnable, &self.limits);
        let mut tasks = Vec::with_capacity(dispatched.len());

        for task_id in dispatched {
            let attempt = self.store.record_dispatched(&task_id, now)?;
            let task_type = self
                .graph
                .node(&task_id)
                .map(|n| n.task().task_type.clone())
                .unwrap_or_default();

            info!(
                execution = %self.execution,
                task = %task_id,
                attempt,
                "dispatching task"
            );

            tasks.push(DispatchedTask {
                execution: self.execution.clone(),
                task_id,
                task_type,
                attempt,
            });
        }

        Ok(tasks)
    }

    /// Record the outcome of a finished attempt and release its slot.
    ///
    /// Completions for tasks that are not running are ignored.
    pub fn complete(&mut self, task: &str, outcome: TaskOutcome, now: DateTime<Utc>) -> Result<()> {
        let running = self
            .store
            .get(task)
            .is_some_and(|s| s.status == TaskStatus::Running);

        if !running {
            warn!(
                execution = %self.execution,
                task = %task,
                "completion for a task that is not running; ignoring"
            );
            return Ok(());
        }

        self.store.record_outcome(task, &outcome, now)?;
        self.dispatcher.mark_completed(&self.execution, task);

        match &outcome {
            TaskOutcome::Success => {
                info!(execution = %self.execution, task = %task, "task succeeded");
            }
            TaskOutcome::Failed(reason) => {
                let exhausted = self.store.get(task).is_some_and(TaskRunState::attempts_exhausted);
                if exhausted {
                    warn!(
                        execution = %self.execution,
                        task = %task,
                        reason = %reason,
                        "task failed; no attempts left"
                    );
                } else {
                    warn!(
                        execution = %self.execution,
                        task = %task,
                        reason = %reason,
                        "task failed; will retry"
                    );
                }
            }
        }

        Ok(())
    }

    /// Give back every slot this execution holds, e.g. after shutdown.
    ///
    /// Run states are left untouched; the abandoned tasks stay `running`.
    pub fn release_in_flight(&mut self) -> usize {
        let running: Vec<TaskId> = self
            .store
            .snapshot()
            .iter()
            .filter(|s| s.status == TaskStatus::Running)
            .map(|s| s.task_id.clone())
            .collect();

        running
            .iter()
            .filter(|task| self.dispatcher.mark_completed(&self.execution, task))
            .count()
    }

    /// Earliest backoff deadline still ahead of `now`, across all failed
    /// tasks with attempts left.
    pub fn next_retry_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.store
            .snapshot()
            .iter()
            .filter(|s| s.status == TaskStatus::Failed && !s.attempts_exhausted())
            .filter_map(|s| s.next_eligible_at)
            .filter(|at| *at > now)
            .min()
    }

    /// Classify the execution at `now`.
    pub fn progress(&self, now: DateTime<Utc>) -> ExecutionProgress {
        let states = self.store.snapshot();

        if self.in_flight() > 0
            || states.iter().any(|s| s.status == TaskStatus::Running)
            || !select_runnable_tasks(&self.graph, states, now).is_empty()
        {
            return ExecutionProgress::Running;
        }

        if states.iter().all(|s| s.status == TaskStatus::Success) {
            return ExecutionProgress::Succeeded;
        }

        let next_retry = states
            .iter()
            .filter(|s| s.status == TaskStatus::Failed && !s.attempts_exhausted())
            .filter_map(|s| s.next_eligible_at)
            .min();

        if let Some(until) = next_retry {
            return ExecutionProgress::WaitingForRetry { until };
        }

        let exhausted: Vec<TaskId> = states
            .iter()
            .filter(|s| s.status == TaskStatus::Failed && s.attempts_exhausted())
            .map(|s| s.task_id.clone())
            .collect();
        let blocked = self.downstream_of(&exhausted);

        debug!(
            execution = %self.execution,
            ?exhausted,
            ?blocked,
            "no task can run any more"
        );

        ExecutionProgress::Failed { exhausted, blocked }
    }

    /// Not-yet-successful tasks reachable from `failed` through dependents,
    /// in declaration order.
    fn downstream_of(&self, failed: &[TaskId]) -> Vec<TaskId> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = failed.iter().map(String::as_str).collect();

        while let Some(id) = stack.pop() {
            for dependent in self.graph.dependents_of(id) {
                if seen.insert(dependent.as_str()) {
                    stack.push(dependent.as_str());
                }
            }
        }

        self.graph
            .task_ids()
            .filter(|id| seen.contains(id))
            .filter(|id| {
                self.store.get(id).is_none_or(|s| {
                    s.status != TaskStatus::Success && s.status != TaskStatus::Failed
                })
            })
            .map(str::to_string)
            .collect()
    }
}
