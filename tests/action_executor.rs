// tests/action_executor.rs

mod common;
use crate::common::builders::{WorkflowFileBuilder, WorkflowTaskBuilder};
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use flowdag::dispatch::SharedDispatcher;
use flowdag::engine::{DispatchedTask, ExecutionOutcome, TaskOutcome};
use flowdag::errors::FlowdagError;
use flowdag::exec::{Action, ActionExecutor, ActionRegistry, FnAction};
use flowdag::run_workflow;
use flowdag::types::TaskStatus;

type TestResult = Result<(), Box<dyn Error>>;

fn succeed(type_name: &str) -> Arc<dyn Action> {
    Arc::new(FnAction::new(type_name, |_task| std::future::ready(TaskOutcome::Success)))
}

#[test]
fn registering_the_same_type_twice_is_rejected() {
    let mut registry = ActionRegistry::new();
    registry.register(succeed("shell")).unwrap();

    let err = registry.register(succeed("shell")).unwrap_err();

    assert!(matches!(err, FlowdagError::ConfigError(_)));
    assert!(err.to_string().contains("'shell'"));
    assert!(registry.contains("shell"));
    assert!(registry.get("http").is_none());
}

#[test]
fn unresolved_reports_each_task_with_an_unknown_type() {
    let mut registry = ActionRegistry::new();
    registry.register(succeed("shell")).unwrap();

    let tasks = vec![
        WorkflowTaskBuilder::new("a").task_type("shell").build(),
        WorkflowTaskBuilder::new("b").task_type("http.get").build(),
        WorkflowTaskBuilder::new("c").task_type("email").build(),
    ];

    let diagnostics = registry.unresolved(&tasks);

    assert_eq!(diagnostics.len(), 2);
    assert_eq!(diagnostics[0].path, "task.1.type");
    assert!(diagnostics[0].message.contains("'http.get'"));
    assert_eq!(diagnostics[1].path, "task.2.type");
    assert!(diagnostics.iter().all(|d| d.is_error()));
}

#[tokio::test]
async fn actions_receive_dispatch_details_and_report_outcomes() -> TestResult {
    init_tracing();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let failures_left = Arc::new(AtomicUsize::new(1));

    let mut registry = ActionRegistry::new();
    {
        let seen = Arc::clone(&seen);
        registry.register(Arc::new(FnAction::new("record", move |task| {
            seen.lock().unwrap().push((task.task_id.clone(), task.attempt));
            std::future::ready(TaskOutcome::Success)
        })))?;
    }
    {
        let failures_left = Arc::clone(&failures_left);
        registry.register(Arc::new(FnAction::new("flaky", move |_task| {
            let failures_left = Arc::clone(&failures_left);
            async move {
                if failures_left
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
                {
                    TaskOutcome::failed("transient")
                } else {
                    TaskOutcome::Success
                }
            }
        })))?;
    }
    let registry = Arc::new(registry);

    let workflow = WorkflowFileBuilder::new("actions")
        .with_task(WorkflowTaskBuilder::new("prepare").task_type("flaky").retry(2).build())
        .with_task(
            WorkflowTaskBuilder::new("publish")
                .task_type("record")
                .needs("prepare")
                .build(),
        )
        .build();

    let report = with_timeout(run_workflow(
        &workflow,
        "exec-7",
        SharedDispatcher::new(),
        |tx| ActionExecutor::new(Arc::clone(&registry), tx),
    ))
    .await?;

    assert!(report.succeeded());
    assert_eq!(report.state_of("prepare").map(|s| s.attempt_count), Some(2));
    assert_eq!(*seen.lock().unwrap(), vec![("publish".to_string(), 1)]);
    Ok(())
}

#[tokio::test]
async fn task_without_registered_action_fails_its_attempts() -> TestResult {
    init_tracing();

    let registry = Arc::new(ActionRegistry::new());
    let workflow = WorkflowFileBuilder::new("unregistered")
        .with_task(WorkflowTaskBuilder::new("orphan").task_type("missing").build())
        .build();

    let report = with_timeout(run_workflow(
        &workflow,
        "exec-1",
        SharedDispatcher::new(),
        |tx| ActionExecutor::new(registry, tx),
    ))
    .await?;

    assert_eq!(
        report.outcome,
        ExecutionOutcome::Failed {
            exhausted: vec!["orphan".to_string()],
            blocked: vec![],
        }
    );
    assert_eq!(report.state_of("orphan").map(|s| s.status), Some(TaskStatus::Failed));
    Ok(())
}

#[tokio::test]
async fn panicking_action_counts_as_a_failed_attempt() -> TestResult {
    init_tracing();

    let mut registry = ActionRegistry::new();
    registry.register(Arc::new(FnAction::new("buggy", |task: DispatchedTask| async move {
        if task.attempt > 0 {
            panic!("action bug on attempt {}", task.attempt);
        }
        TaskOutcome::Success
    })))?;
    registry.register(succeed("shell"))?;
    let registry = Arc::new(registry);

    let workflow = WorkflowFileBuilder::new("panics")
        .with_task(WorkflowTaskBuilder::new("crash").task_type("buggy").retry(2).build())
        .with_task(WorkflowTaskBuilder::new("after").task_type("shell").needs("crash").build())
        .with_task(WorkflowTaskBuilder::new("other").task_type("shell").build())
        .build();

    let report = with_timeout(run_workflow(
        &workflow,
        "exec-1",
        SharedDispatcher::new(),
        |tx| ActionExecutor::new(registry, tx),
    ))
    .await?;

    assert_eq!(
        report.outcome,
        ExecutionOutcome::Failed {
            exhausted: vec!["crash".to_string()],
            blocked: vec!["after".to_string()],
        }
    );
    assert_eq!(report.state_of("crash").map(|s| s.attempt_count), Some(2));
    assert_eq!(report.state_of("other").map(|s| s.status), Some(TaskStatus::Success));
    Ok(())
}
