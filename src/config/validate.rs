// src/config/validate.rs

//! Schema-level checks on a workflow definition.
//!
//! These run before the graph builder and only look at individual fields;
//! dependency structure (duplicates, missing needs, cycles) is the graph
//! builder's job.

use tracing::warn;

use crate::config::model::{RawWorkflowFile, WorkflowFile};
use crate::diagnostics::{has_errors, Diagnostic, Severity};
use crate::errors::FlowdagError;

impl TryFrom<RawWorkflowFile> for WorkflowFile {
    type Error = FlowdagError;

    fn try_from(raw: RawWorkflowFile) -> std::result::Result<Self, Self::Error> {
        let diagnostics = validate_raw_workflow(&raw);

        for d in diagnostics.iter().filter(|d| d.severity == Severity::Warning) {
            warn!(path = %d.path, "{}", d.message);
        }

        if has_errors(&diagnostics) {
            return Err(FlowdagError::InvalidWorkflow { diagnostics });
        }

        Ok(WorkflowFile::new_unchecked(raw.workflow, raw.limits, raw.task))
    }
}

/// Collect every schema problem in `raw`, errors and warnings alike.
pub fn validate_raw_workflow(raw: &RawWorkflowFile) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_workflow_section(raw, &mut diagnostics);
    validate_limits(raw, &mut diagnostics);
    validate_tasks(raw, &mut diagnostics);
    diagnostics
}

fn validate_workflow_section(raw: &RawWorkflowFile, out: &mut Vec<Diagnostic>) {
    if raw.workflow.name.trim().is_empty() {
        out.push(Diagnostic::error(
            "workflow.name",
            "workflow name must not be empty",
        ));
    }
}

fn validate_limits(raw: &RawWorkflowFile, out: &mut Vec<Diagnostic>) {
    if raw.limits.max_in_flight_global == 0 {
        out.push(Diagnostic::error(
            "limits.max_in_flight_global",
            "max_in_flight_global must be >= 1 (got 0)",
        ));
    }
    if raw.limits.max_in_flight_per_execution == 0 {
        out.push(Diagnostic::error(
            "limits.max_in_flight_per_execution",
            "max_in_flight_per_execution must be >= 1 (got 0)",
        ));
    }
}

fn validate_tasks(raw: &RawWorkflowFile, out: &mut Vec<Diagnostic>) {
    if raw.task.is_empty() {
        out.push(Diagnostic::error(
            "task",
            "workflow must contain at least one [[task]] entry",
        ));
        return;
    }

    for (i, task) in raw.task.iter().enumerate() {
        check_identifier(&format!("task.{i}.id"), "task id", &task.id, out);
        check_identifier(&format!("task.{i}.type"), "task type", &task.task_type, out);

        if let Some(retry) = task.retry {
            if retry.max == 0 {
                out.push(Diagnostic::error(
                    format!("task.{i}.retry.max"),
                    format!("task '{}': retry.max must be >= 1 (got 0)", task.id),
                ));
            } else if retry.max == 1 && retry.backoff_seconds.is_some() {
                out.push(Diagnostic::warning(
                    format!("task.{i}.retry.backoff_seconds"),
                    format!(
                        "task '{}': backoff_seconds has no effect with retry.max = 1",
                        task.id
                    ),
                ));
            }
        }
    }
}

fn check_identifier(path: &str, what: &str, value: &str, out: &mut Vec<Diagnostic>) {
    if value.is_empty() {
        out.push(Diagnostic::error(path, format!("{what} must not be empty")));
    } else if value.chars().any(char::is_whitespace) {
        out.push(Diagnostic::error(
            path,
            format!("{what} '{value}' must not contain whitespace"),
        ));
    }
}
