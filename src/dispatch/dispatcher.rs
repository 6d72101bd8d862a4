// src/dispatch/dispatcher.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Deserialize;
use tracing::debug;

use crate::dispatch::in_flight::InFlightSet;
use crate::types::{ExecutionId, TaskId};

/// Concurrency ceilings applied on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchLimits {
    /// Total in-flight tasks across every execution sharing the dispatcher.
    #[serde(default = "default_max_in_flight_global")]
    pub max_in_flight_global: usize,
    /// In-flight tasks belonging to a single execution.
    #[serde(default = "default_max_in_flight_per_execution")]
    pub max_in_flight_per_execution: usize,
}

fn default_max_in_flight_global() -> usize {
    16
}

fn default_max_in_flight_per_execution() -> usize {
    4
}

impl Default for DispatchLimits {
    fn default() -> Self {
        Self {
            max_in_flight_global: default_max_in_flight_global(),
            max_in_flight_per_execution: default_max_in_flight_per_execution(),
        }
    }
}

impl DispatchLimits {
    pub fn new(max_in_flight_global: usize, max_in_flight_per_execution: usize) -> Self {
        Self {
            max_in_flight_global,
            max_in_flight_per_execution,
        }
    }

    /// No ceiling at all.
    pub fn unbounded() -> Self {
        Self::new(usize::MAX, usize::MAX)
    }

    /// Only the global ceiling applies.
    pub fn global(max: usize) -> Self {
        Self::new(max, usize::MAX)
    }

    /// Only the per-execution ceiling applies.
    pub fn per_execution(max: usize) -> Self {
        Self::new(usize::MAX, max)
    }
}

/// Capacity-bounded, idempotent task dispatch.
///
/// Tracks in-flight tasks per execution; the global count is the sum over all
/// executions. The same task id in two executions occupies two slots.
#[derive(Debug, Default)]
pub struct Dispatcher {
    executions: HashMap<ExecutionId, InFlightSet>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// In-flight tasks across all executions.
    pub fn in_flight_count(&self) -> usize {
        self.executions.values().map(InFlightSet::size).sum()
    }

    /// In-flight tasks of one execution.
    pub fn in_flight_for(&self, execution: &str) -> usize {
        self.executions
            .get(execution)
            .map(InFlightSet::size)
            .unwrap_or(0)
    }

    pub fn is_in_flight(&self, execution: &str, task: &str) -> bool {
        self.executions
            .get(execution)
            .is_some_and(|set| set.contains(task))
    }

    /// Sorted ids of the tasks in flight for `execution`.
    pub fn in_flight_tasks(&self, execution: &str) -> Vec<TaskId> {
        self.executions
            .get(execution)
            .map(InFlightSet::task_ids)
            .unwrap_or_default()
    }

    /// Remaining capacity for `execution` under `limits`.
    pub fn capacity(&self, execution: &str, limits: &DispatchLimits) -> usize {
        let global = limits
            .max_in_flight_global
            .saturating_sub(self.in_flight_count());
        let local = limits
            .max_in_flight_per_execution
            .saturating_sub(self.in_flight_for(execution));
        global.min(local)
    }

    /// Run one scheduling tick for `execution`.
    ///
    /// Candidates are considered in id order. Tasks already in flight are
    /// skipped without using capacity; the rest are dispatched until capacity
    /// runs out. Returns the newly dispatched ids in dispatch order.
    pub fn tick(
        &mut self,
        execution: &str,
        runnable: &[TaskId],
        limits: &DispatchLimits,
    ) -> Vec<TaskId> {
        let mut candidates: Vec<&TaskId> = runnable.iter().collect();
        candidates.sort();

        let mut remaining = self.capacity(execution, limits);
        let mut dispatched = Vec::new();

        if remaining == 0 {
            debug!(
                execution = %execution,
                candidates = candidates.len(),
                "no capacity left; nothing dispatched"
            );
            return dispatched;
        }

        let set = self.executions.entry(execution.to_string()).or_default();

        for task in candidates {
            if set.contains(task) {
                debug!(execution = %execution, task = %task, "skipping task already in flight");
                continue;
            }
            if remaining == 0 {
                break;
            }
            set.enqueue_if_absent(task);
            remaining -= 1;
            dispatched.push(task.clone());
        }

        if set.is_empty() {
            self.executions.remove(execution);
        }

        debug!(
            execution = %execution,
            ?dispatched,
            in_flight = self.in_flight_count(),
            "scheduler tick complete"
        );

        dispatched
    }

    /// Release the slot held by `task` in `execution`.
    ///
    /// Completing a task that is not in flight does nothing. Returns `true`
    /// if a slot was freed.
    pub fn mark_completed(&mut self, execution: &str, task: &str) -> bool {
        let Some(set) = self.executions.get_mut(execution) else {
            return false;
        };

        let removed = set.remove(task);
        if set.is_empty() {
            self.executions.remove(execution);
        }

        if removed {
            debug!(execution = %execution, task = %task, "task completed; slot released");
        }
        removed
    }
}

/// One scheduling tick: dispatch up to capacity from `runnable`.
pub fn scheduler_tick(
    runnable: &[TaskId],
    dispatcher: &mut Dispatcher,
    limits: &DispatchLimits,
    execution: &str,
) -> Vec<TaskId> {
    dispatcher.tick(execution, runnable, limits)
}

/// A [`Dispatcher`] shared between drivers on different threads.
///
/// Every tick and completion runs under one lock, so the check-then-insert
/// sequence of a tick is never interleaved with another.
#[derive(Debug, Clone, Default)]
pub struct SharedDispatcher {
    inner: Arc<Mutex<Dispatcher>>,
}

impl SharedDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(
        &self,
        execution: &str,
        runnable: &[TaskId],
        limits: &DispatchLimits,
    ) -> Vec<TaskId> {
        self.lock().tick(execution, runnable, limits)
    }

    pub fn mark_completed(&self, execution: &str, task: &str) -> bool {
        self.lock().mark_completed(execution, task)
    }

    pub fn in_flight_count(&self) -> usize {
        self.lock().in_flight_count()
    }

    pub fn in_flight_for(&self, execution: &str) -> usize {
        self.lock().in_flight_for(execution)
    }

    pub fn is_in_flight(&self, execution: &str, task: &str) -> bool {
        self.lock().is_in_flight(execution, task)
    }

    fn lock(&self) -> MutexGuard<'_, Dispatcher> {
        // Every ledger update is a single insert or remove, so poisoning is ignored.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
