// src/dag/runnable.rs

//! Selection of tasks that may start now.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::dag::graph::{WorkflowGraph, WorkflowGraphNode};
use crate::dag::run_state::TaskRunState;
use crate::types::{TaskId, TaskStatus};

/// Ids of tasks eligible to start at `now`, sorted by id.
///
/// A task is runnable when every dependency has succeeded and its own state
/// allows a new attempt: never attempted, still pending, or failed with
/// attempts left and any backoff elapsed. Running and succeeded tasks are
/// never runnable.
///
/// If `states` holds several records for one task, the last one wins.
pub fn select_runnable_tasks(
    graph: &WorkflowGraph,
    states: &[TaskRunState],
    now: DateTime<Utc>,
) -> Vec<TaskId> {
    let by_id: HashMap<&str, &TaskRunState> = states
        .iter()
        .map(|s| (s.task_id.as_str(), s))
        .collect();

    let mut runnable: Vec<TaskId> = graph
        .nodes()
        .filter(|node| deps_satisfied(node, &by_id))
        .filter(|node| match by_id.get(node.id()) {
            None => true,
            Some(state) => match state.status {
                TaskStatus::Pending => true,
                TaskStatus::Failed => state.retry_eligible(now),
                TaskStatus::Running | TaskStatus::Success => false,
            },
        })
        .map(|node| node.id().to_string())
        .collect();

    runnable.sort();
    runnable
}

/// Whether every dependency of `node` has a recorded success.
fn deps_satisfied(node: &WorkflowGraphNode, states: &HashMap<&str, &TaskRunState>) -> bool {
    node.dependencies().iter().all(|dep| {
        states
            .get(dep.as_str())
            .is_some_and(|s| s.status == TaskStatus::Success)
    })
}
