// src/lib.rs

//! `flowdag`: scheduling core of a workflow orchestration engine.
//!
//! Workflows are DAGs of tasks linked by `needs` edges. The scheduling core
//! builds and validates the graph ([`dag::build_workflow_graph`]), orders it
//! ([`dag::topological_sort`]), decides which tasks may start
//! ([`dag::select_runnable_tasks`]) and launches a capacity-bounded subset
//! ([`dispatch::Dispatcher`]). The [`engine`] and [`exec`] modules provide a
//! reference driver around that core.

pub mod config;
pub mod dag;
pub mod diagnostics;
pub mod dispatch;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::config::{load_and_validate, WorkflowFile};
use crate::dag::topological_sort;
use crate::dispatch::SharedDispatcher;
use crate::engine::{CoreRuntime, ExecutionReport, Runtime, RuntimeEvent, ShutdownListener};
use crate::errors::{FlowdagError, Result};
use crate::exec::{ActionExecutor, ActionRegistry, ExecutorBackend};
use crate::types::ExecutionId;

/// Drive one execution of `workflow` to completion.
///
/// `make_executor` receives the sender on which the executor must report
/// completions. Pass the same `dispatcher` to concurrent executions to make
/// them share the global in-flight ceiling.
pub async fn run_workflow<E, F>(
    workflow: &WorkflowFile,
    execution: impl Into<ExecutionId>,
    dispatcher: SharedDispatcher,
    make_executor: F,
) -> Result<ExecutionReport>
where
    E: ExecutorBackend,
    F: FnOnce(mpsc::Sender<RuntimeEvent>) -> E,
{
    let execution = execution.into();
    let graph = workflow.build_graph()?;

    let order = topological_sort(&graph)?;
    info!(
        workflow = %workflow.name(),
        execution = %execution,
        ?order,
        "planned task order"
    );

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = make_executor(rt_tx);

    let core = CoreRuntime::with_dispatcher(execution, graph, workflow.limits(), dispatcher);
    Runtime::new(core, rt_rx, executor).run().await
}

/// High-level entry point: load a workflow file and run it with the actions
/// in `registry`.
///
/// Schema problems, task types without an action, and graph problems all
/// fail before anything runs; their diagnostics can be rendered with
/// [`config::format_diagnostics`]. Ctrl-C stops the execution gracefully.
pub async fn run_workflow_file(
    path: impl AsRef<Path>,
    execution: impl Into<ExecutionId>,
    registry: Arc<ActionRegistry>,
) -> Result<ExecutionReport> {
    let workflow = load_and_validate(path.as_ref())?;

    let diagnostics = registry.unresolved(workflow.tasks());
    if !diagnostics.is_empty() {
        return Err(FlowdagError::InvalidWorkflow { diagnostics });
    }

    let mut listener = None;
    let report = run_workflow(&workflow, execution, SharedDispatcher::new(), |rt_tx| {
        listener = Some(ShutdownListener::spawn(rt_tx.clone()));
        ActionExecutor::new(registry, rt_tx)
    })
    .await;

    drop(listener);
    report
}
