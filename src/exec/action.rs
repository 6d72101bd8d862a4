// src/exec/action.rs

//! Action plugins: the code that actually performs a task of a given type.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::dag::WorkflowTask;
use crate::diagnostics::Diagnostic;
use crate::engine::{DispatchedTask, RuntimeEvent, TaskOutcome};
use crate::errors::{FlowdagError, Result};
use crate::exec::backend::ExecutorBackend;

pub type ActionFuture<'a> = Pin<Box<dyn Future<Output = TaskOutcome> + Send + 'a>>;

/// Implementation of one task type.
pub trait Action: Send + Sync {
    /// The `type` value in workflow files this action handles.
    fn type_name(&self) -> &str;

    /// Perform one attempt of `task`.
    fn run(&self, task: DispatchedTask) -> ActionFuture<'_>;
}

/// An [`Action`] backed by an async closure.
pub struct FnAction<F> {
    type_name: String,
    f: F,
}

impl<F, Fut> FnAction<F>
where
    F: Fn(DispatchedTask) -> Fut + Send + Sync,
    Fut: Future<Output = TaskOutcome> + Send + 'static,
{
    pub fn new(type_name: impl Into<String>, f: F) -> Self {
        Self {
            type_name: type_name.into(),
            f,
        }
    }
}

impl<F, Fut> Action for FnAction<F>
where
    F: Fn(DispatchedTask) -> Fut + Send + Sync,
    Fut: Future<Output = TaskOutcome> + Send + 'static,
{
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn run(&self, task: DispatchedTask) -> ActionFuture<'_> {
        Box::pin((self.f)(task))
    }
}

/// Registered actions keyed by task type.
#[derive(Default, Clone)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.actions.keys().collect();
        types.sort();
        f.debug_struct("ActionRegistry").field("types", &types).finish()
    }
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `action` under its type name.
    ///
    /// Each type can be registered once.
    pub fn register(&mut self, action: Arc<dyn Action>) -> Result<()> {
        let name = action.type_name().to_string();
        if self.actions.contains_key(&name) {
            return Err(FlowdagError::ConfigError(format!(
                "an action for task type '{name}' is already registered"
            )));
        }
        debug!(task_type = %name, "registered action");
        self.actions.insert(name, action);
        Ok(())
    }

    pub fn get(&self, task_type: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(task_type).cloned()
    }

    pub fn contains(&self, task_type: &str) -> bool {
        self.actions.contains_key(task_type)
    }

    /// One diagnostic per task whose type has no registered action.
    pub fn unresolved(&self, tasks: &[WorkflowTask]) -> Vec<Diagnostic> {
        tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| !self.contains(&t.task_type))
            .map(|(i, t)| {
                Diagnostic::error(
                    format!("task.{i}.type"),
                    format!("task '{}': unknown task type '{}'", t.id, t.task_type),
                )
            })
            .collect()
    }
}

/// Executor backend that runs each dispatched task through the registry.
///
/// Every attempt runs in its own Tokio task; its outcome is reported as a
/// `TaskCompleted` event. An action that panics counts as a failed attempt.
pub struct ActionExecutor {
    registry: Arc<ActionRegistry>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl ActionExecutor {
    pub fn new(registry: Arc<ActionRegistry>, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            registry,
            runtime_tx,
        }
    }
}

impl ExecutorBackend for ActionExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<DispatchedTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for task in tasks {
                let action = self.registry.get(&task.task_type);
                let tx = self.runtime_tx.clone();

                tokio::spawn(async move {
                    let task_id = task.task_id.clone();
                    let outcome = match action {
                        Some(action) => run_attempt(action, task).await,
                        None => {
                            warn!(
                                task = %task_id,
                                task_type = %task.task_type,
                                "no action registered"
                            );
                            TaskOutcome::failed(format!(
                                "no action registered for task type '{}'",
                                task.task_type
                            ))
                        }
                    };

                    if tx
                        .send(RuntimeEvent::TaskCompleted {
                            task: task_id.clone(),
                            outcome,
                        })
                        .await
                        .is_err()
                    {
                        debug!(task = %task_id, "runtime gone; completion dropped");
                    }
                });
            }
            Ok(())
        })
    }
}

/// Run one attempt on its own Tokio task so a panicking action still yields
/// an outcome.
async fn run_attempt(action: Arc<dyn Action>, task: DispatchedTask) -> TaskOutcome {
    let task_id = task.task_id.clone();
    match tokio::spawn(async move { action.run(task).await }).await {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!(task = %task_id, error = %err, "action did not complete");
            TaskOutcome::failed(format!("action panicked or was cancelled: {err}"))
        }
    }
}
