// src/dag/mod.rs

//! Dependency graph and task eligibility.
//!
//! - [`graph`] validates task lists and builds the [`WorkflowGraph`].
//! - [`topo`] orders a graph deterministically.
//! - [`run_state`] holds the per-task [`TaskRunState`] the driver reports.
//! - [`runnable`] decides which tasks may start now.
//!
//! Everything here is synchronous and free of IO.

pub mod graph;
pub mod run_state;
pub mod runnable;
pub mod topo;

pub use graph::{build_workflow_graph, WorkflowGraph, WorkflowGraphNode, WorkflowTask};
pub use run_state::TaskRunState;
pub use runnable::select_runnable_tasks;
pub use topo::topological_sort;
