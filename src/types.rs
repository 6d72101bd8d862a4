// src/types.rs

//! Shared identifiers and small value types used across the crate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical task identifier type. Unique within one workflow.
pub type TaskId = String;

/// Identifier of one workflow execution.
///
/// The dispatcher partitions its per-execution in-flight counts by this key.
pub type ExecutionId = String;

/// Lifecycle status of a single task within one execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Running,
    Success,
    Failed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Success => "success",
            TaskStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "running" => Ok(TaskStatus::Running),
            "success" => Ok(TaskStatus::Success),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(format!(
                "invalid task status: {other} \
                 (expected pending, running, success or failed)"
            )),
        }
    }
}

/// Retry policy attached to a task.
///
/// `max` is the total number of attempts, including the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryPolicy {
    pub max: u32,
    #[serde(default)]
    pub backoff_seconds: Option<u64>,
}

impl RetryPolicy {
    pub fn new(max: u32) -> Self {
        Self {
            max,
            backoff_seconds: None,
        }
    }

    pub fn with_backoff(max: u32, backoff_seconds: u64) -> Self {
        Self {
            max,
            backoff_seconds: Some(backoff_seconds),
        }
    }
}

/// Attempt ceiling for a task with the given (optional) retry policy.
///
/// Tasks without a policy get exactly one attempt.
pub fn max_attempts_for(retry: Option<&RetryPolicy>) -> u32 {
    retry.map(|r| r.max.max(1)).unwrap_or(1)
}
