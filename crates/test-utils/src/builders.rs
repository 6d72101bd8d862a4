#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use flowdag::config::{RawWorkflowFile, WorkflowFile, WorkflowSection};
use flowdag::dag::{TaskRunState, WorkflowTask};
use flowdag::dispatch::DispatchLimits;
use flowdag::types::{RetryPolicy, TaskStatus};

/// Fixed reference instant so timing assertions do not depend on the clock.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

/// `t0()` shifted by `secs` seconds.
pub fn at(secs: i64) -> DateTime<Utc> {
    t0() + chrono::Duration::seconds(secs)
}

/// Builder for `WorkflowTask`.
pub struct WorkflowTaskBuilder {
    task: WorkflowTask,
}

impl WorkflowTaskBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            task: WorkflowTask::new(id, "noop"),
        }
    }

    pub fn task_type(mut self, task_type: &str) -> Self {
        self.task.task_type = task_type.to_string();
        self
    }

    pub fn needs(mut self, dep: &str) -> Self {
        self.task.needs.push(dep.to_string());
        self
    }

    pub fn retry(mut self, max: u32) -> Self {
        self.task.retry = Some(RetryPolicy::new(max));
        self
    }

    pub fn retry_with_backoff(mut self, max: u32, backoff_seconds: u64) -> Self {
        self.task.retry = Some(RetryPolicy::with_backoff(max, backoff_seconds));
        self
    }

    pub fn build(self) -> WorkflowTask {
        self.task
    }
}

/// Shorthand for a task of type `noop` with the given dependencies.
pub fn task(id: &str, needs: &[&str]) -> WorkflowTask {
    WorkflowTask::new(id, "noop").needs(needs.iter().copied())
}

/// Builder for `WorkflowFile` to simplify test setup.
pub struct WorkflowFileBuilder {
    raw: RawWorkflowFile,
}

impl WorkflowFileBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            raw: RawWorkflowFile {
                workflow: WorkflowSection {
                    name: name.to_string(),
                    version: 1,
                    description: None,
                },
                limits: DispatchLimits::default(),
                task: Vec::new(),
            },
        }
    }

    pub fn with_task(mut self, task: WorkflowTask) -> Self {
        self.raw.task.push(task);
        self
    }

    pub fn with_limits(mut self, limits: DispatchLimits) -> Self {
        self.raw.limits = limits;
        self
    }

    pub fn raw(self) -> RawWorkflowFile {
        self.raw
    }

    pub fn build(self) -> WorkflowFile {
        WorkflowFile::try_from(self.raw).expect("Failed to build valid workflow from builder")
    }
}

/// Run state helpers for selector tests.
pub fn state(id: &str, status: TaskStatus) -> TaskRunState {
    TaskRunState::pending(id, 1).with_status(status)
}

pub fn failed(id: &str, attempts: u32, max_attempts: u32) -> TaskRunState {
    TaskRunState::pending(id, max_attempts)
        .with_status(TaskStatus::Failed)
        .with_attempts(attempts)
}
