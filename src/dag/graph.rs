// src/dag/graph.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diagnostics::Diagnostic;
use crate::errors::GraphValidationError;
use crate::types::{max_attempts_for, RetryPolicy, TaskId};

/// A task as declared in a workflow, after loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowTask {
    pub id: TaskId,
    /// Opaque action-type identifier, resolved by the executor.
    #[serde(rename = "type")]
    pub task_type: String,
    /// Ids of the tasks that must succeed before this one may start.
    #[serde(default)]
    pub needs: Vec<TaskId>,
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
}

impl WorkflowTask {
    pub fn new(id: impl Into<TaskId>, task_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            task_type: task_type.into(),
            needs: Vec::new(),
            retry: None,
        }
    }

    pub fn needs<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskId>,
    {
        self.needs.extend(deps.into_iter().map(Into::into));
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Attempt ceiling derived from the retry policy (1 when unspecified).
    pub fn max_attempts(&self) -> u32 {
        max_attempts_for(self.retry.as_ref())
    }
}

/// One node of a [`WorkflowGraph`].
///
/// `dependencies` is a copy of the task's `needs`; `dependents` is derived by
/// inverting the dependency edges across the whole graph.
#[derive(Debug, Clone)]
pub struct WorkflowGraphNode {
    task: WorkflowTask,
    dependencies: Vec<TaskId>,
    dependents: Vec<TaskId>,
}

impl WorkflowGraphNode {
    pub fn id(&self) -> &str {
        &self.task.id
    }

    pub fn task(&self) -> &WorkflowTask {
        &self.task
    }

    pub fn dependencies(&self) -> &[TaskId] {
        &self.dependencies
    }

    pub fn dependents(&self) -> &[TaskId] {
        &self.dependents
    }
}

/// Validated, acyclic task graph.
///
/// Nodes live in a flat arena in declaration order; edges are id lists. The
/// only way to obtain a value is [`build_workflow_graph`], so every instance
/// upholds: unique ids, resolvable dependencies, no self-dependencies and no
/// cycles.
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    nodes: Vec<WorkflowGraphNode>,
    index: HashMap<TaskId, usize>,
    roots: Vec<TaskId>,
}

impl WorkflowGraph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&WorkflowGraphNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Position of `id` in declaration order.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &WorkflowGraphNode> {
        self.nodes.iter()
    }

    /// Task ids in declaration order.
    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id())
    }

    /// Nodes without dependencies, in declaration order.
    pub fn roots(&self) -> &[TaskId] {
        &self.roots
    }

    pub fn dependencies_of(&self, id: &str) -> &[TaskId] {
        self.node(id).map(|n| n.dependencies()).unwrap_or(&[])
    }

    pub fn dependents_of(&self, id: &str) -> &[TaskId] {
        self.node(id).map(|n| n.dependents()).unwrap_or(&[])
    }

    pub(crate) fn node_at(&self, index: usize) -> &WorkflowGraphNode {
        &self.nodes[index]
    }
}

/// Validate a flat list of tasks and build the dependency graph.
///
/// Identity problems (empty or duplicate ids) are reported on their own,
/// since edges cannot be resolved until every id is known. Otherwise every
/// self-dependency and missing dependency is reported, together with the
/// first cycle found among the remaining edges.
pub fn build_workflow_graph(
    tasks: &[WorkflowTask],
) -> Result<WorkflowGraph, GraphValidationError> {
    let index = index_task_ids(tasks)?;

    let mut diagnostics = Vec::new();
    // Adjacency restricted to edges that resolve to another task.
    let mut edges: Vec<Vec<usize>> = Vec::with_capacity(tasks.len());

    for (i, task) in tasks.iter().enumerate() {
        let mut resolved = Vec::with_capacity(task.needs.len());
        for (j, dep) in task.needs.iter().enumerate() {
            if dep == &task.id {
                diagnostics.push(Diagnostic::error(
                    format!("task.{i}.needs.{j}"),
                    format!("task '{}' cannot depend on itself", task.id),
                ));
            } else if let Some(&dep_idx) = index.get(dep.as_str()) {
                resolved.push(dep_idx);
            } else {
                diagnostics.push(Diagnostic::error(
                    format!("task.{i}.needs.{j}"),
                    format!("task '{}' needs unknown task '{}'", task.id, dep),
                ));
            }
        }
        edges.push(resolved);
    }

    if let Some(cycle) = find_cycle(&edges) {
        let start = cycle[0];
        let path = cycle
            .iter()
            .map(|&n| tasks[n].id.as_str())
            .collect::<Vec<_>>()
            .join(" -> ");
        diagnostics.push(Diagnostic::error(
            format!("task.{start}.needs"),
            format!("dependency cycle detected: {path}"),
        ));
    }

    if !diagnostics.is_empty() {
        debug!(problems = diagnostics.len(), "workflow graph rejected");
        return Err(GraphValidationError::new(diagnostics));
    }

    let mut nodes: Vec<WorkflowGraphNode> = tasks
        .iter()
        .map(|task| WorkflowGraphNode {
            task: task.clone(),
            dependencies: task.needs.clone(),
            dependents: Vec::new(),
        })
        .collect();

    for (i, deps) in edges.iter().enumerate() {
        for &dep_idx in deps {
            let id = tasks[i].id.clone();
            let dependents = &mut nodes[dep_idx].dependents;
            if !dependents.contains(&id) {
                dependents.push(id);
            }
        }
    }

    let roots = nodes
        .iter()
        .filter(|n| n.dependencies.is_empty())
        .map(|n| n.task.id.clone())
        .collect();

    let index = index
        .into_iter()
        .map(|(id, i)| (id.to_string(), i))
        .collect();

    Ok(WorkflowGraph {
        nodes,
        index,
        roots,
    })
}

fn index_task_ids(tasks: &[WorkflowTask]) -> Result<HashMap<&str, usize>, GraphValidationError> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(tasks.len());
    let mut diagnostics = Vec::new();

    for (i, task) in tasks.iter().enumerate() {
        if task.id.trim().is_empty() {
            diagnostics.push(Diagnostic::error(
                format!("task.{i}.id"),
                "task id must not be empty",
            ));
            continue;
        }
        if let Some(&first) = index.get(task.id.as_str()) {
            diagnostics.push(Diagnostic::error(
                format!("task.{i}.id"),
                format!(
                    "duplicate task id '{}' (first declared at task.{first})",
                    task.id
                ),
            ));
            continue;
        }
        index.insert(task.id.as_str(), i);
    }

    if diagnostics.is_empty() {
        Ok(index)
    } else {
        Err(GraphValidationError::new(diagnostics))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Three-colour depth-first search over `edges` (node -> its dependencies).
///
/// Returns the first cycle found as a closed path, e.g. `[a, b, a]`.
fn find_cycle(edges: &[Vec<usize>]) -> Option<Vec<usize>> {
    let mut marks = vec![Mark::Unvisited; edges.len()];
    // (node, position of the next edge to follow)
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for start in 0..edges.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }

        marks[start] = Mark::InProgress;
        stack.push((start, 0));

        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;
            if let Some(&dep) = edges[node].get(next) {
                top.1 += 1;
                match marks[dep] {
                    Mark::Unvisited => {
                        marks[dep] = Mark::InProgress;
                        stack.push((dep, 0));
                    }
                    Mark::InProgress => {
                        let from = stack.iter().position(|&(n, _)| n == dep).unwrap_or(0);
                        let mut cycle: Vec<usize> = stack[from..].iter().map(|&(n, _)| n).collect();
                        cycle.push(dep);
                        return Some(cycle);
                    }
                    Mark::Done => {}
                }
            } else {
                marks[node] = Mark::Done;
                stack.pop();
            }
        }
    }

    None
}
