// src/dag/topo.rs

//! Deterministic topological ordering.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use crate::dag::graph::WorkflowGraph;
use crate::diagnostics::Diagnostic;
use crate::errors::GraphValidationError;
use crate::types::TaskId;

/// Order every task so that each one comes after all of its dependencies.
///
/// Among tasks whose dependencies are already placed, the one declared
/// earliest always goes next. With no ordering forced by `needs`, the result
/// is the declaration order itself.
///
/// Graphs from [`build_workflow_graph`](crate::dag::build_workflow_graph) are
/// acyclic. A graph that still contains a cycle yields an error, never a
/// partial order.
pub fn topological_sort(graph: &WorkflowGraph) -> Result<Vec<TaskId>, GraphValidationError> {
    let mut remaining: Vec<usize> = graph
        .nodes()
        .map(|node| {
            node.dependencies()
                .iter()
                .collect::<HashSet<_>>()
                .len()
        })
        .collect();

    let mut ready: BinaryHeap<Reverse<usize>> = remaining
        .iter()
        .enumerate()
        .filter(|(_, count)| **count == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(graph.len());

    while let Some(Reverse(i)) = ready.pop() {
        let node = graph.node_at(i);
        order.push(node.id().to_string());

        for dependent in node.dependents() {
            if let Some(j) = graph.index_of(dependent) {
                remaining[j] -= 1;
                if remaining[j] == 0 {
                    ready.push(Reverse(j));
                }
            }
        }
    }

    if order.len() != graph.len() {
        let unplaced = graph
            .task_ids()
            .filter(|id| !order.iter().any(|o| o == id))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(GraphValidationError::new(vec![Diagnostic::error(
            "task",
            format!("cannot order tasks involved in a dependency cycle: {unplaced}"),
        )]));
    }

    Ok(order)
}
