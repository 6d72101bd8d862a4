// src/config/model.rs

use serde::Deserialize;

use crate::dag::{build_workflow_graph, WorkflowGraph, WorkflowTask};
use crate::dispatch::DispatchLimits;
use crate::errors::GraphValidationError;

/// Workflow definition exactly as read from a TOML file.
///
/// ```toml
/// [workflow]
/// name = "nightly"
///
/// [limits]
/// max_in_flight_global = 8
/// max_in_flight_per_execution = 2
///
/// [[task]]
/// id = "fetch"
/// type = "http.get"
///
/// [[task]]
/// id = "report"
/// type = "shell"
/// needs = ["fetch"]
/// retry = { max = 3, backoff_seconds = 10 }
/// ```
///
/// `[[task]]` entries keep their declaration order, which later decides
/// tie-breaks in the topological order.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawWorkflowFile {
    pub workflow: WorkflowSection,

    #[serde(default)]
    pub limits: DispatchLimits,

    #[serde(default)]
    pub task: Vec<WorkflowTask>,
}

/// `[workflow]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowSection {
    pub name: String,

    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub description: Option<String>,
}

fn default_version() -> u32 {
    1
}

/// A workflow definition that passed schema validation.
///
/// Obtained through `WorkflowFile::try_from(raw)` or
/// [`load_and_validate`](crate::config::load_and_validate). Structural graph
/// checks happen separately in [`WorkflowFile::build_graph`].
#[derive(Debug, Clone)]
pub struct WorkflowFile {
    workflow: WorkflowSection,
    limits: DispatchLimits,
    tasks: Vec<WorkflowTask>,
}

impl WorkflowFile {
    pub(crate) fn new_unchecked(
        workflow: WorkflowSection,
        limits: DispatchLimits,
        tasks: Vec<WorkflowTask>,
    ) -> Self {
        Self {
            workflow,
            limits,
            tasks,
        }
    }

    pub fn name(&self) -> &str {
        &self.workflow.name
    }

    pub fn version(&self) -> u32 {
        self.workflow.version
    }

    pub fn description(&self) -> Option<&str> {
        self.workflow.description.as_deref()
    }

    pub fn limits(&self) -> DispatchLimits {
        self.limits
    }

    /// Tasks in declaration order.
    pub fn tasks(&self) -> &[WorkflowTask] {
        &self.tasks
    }

    pub fn build_graph(&self) -> Result<WorkflowGraph, GraphValidationError> {
        build_workflow_graph(&self.tasks)
    }
}
