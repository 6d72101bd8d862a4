// tests/config_loading.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use flowdag::config::{
    format_diagnostics, load_and_validate, load_from_path, parse_str, validate_raw_workflow,
};
use flowdag::dispatch::DispatchLimits;
use flowdag::engine::TaskOutcome;
use flowdag::errors::FlowdagError;
use flowdag::exec::{ActionRegistry, FnAction};
use flowdag::run_workflow_file;

type TestResult = Result<(), Box<dyn Error>>;

fn write_workflow(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("workflow.toml");
    fs::write(&path, contents).expect("write workflow file");
    path
}

const NIGHTLY: &str = r#"
[workflow]
name = "nightly"
description = "Nightly build"

[limits]
max_in_flight_global = 8
max_in_flight_per_execution = 2

[[task]]
id = "fetch"
type = "http.get"

[[task]]
id = "build"
type = "shell"
needs = ["fetch"]
retry = { max = 3, backoff_seconds = 10 }

[[task]]
id = "report"
type = "shell"
needs = ["build"]
"#;

#[test]
fn loads_a_complete_workflow_file() -> TestResult {
    let dir = TempDir::new()?;
    let path = write_workflow(&dir, NIGHTLY);

    let workflow = load_and_validate(&path)?;

    assert_eq!(workflow.name(), "nightly");
    assert_eq!(workflow.version(), 1);
    assert_eq!(workflow.description(), Some("Nightly build"));
    assert_eq!(workflow.limits(), DispatchLimits::new(8, 2));

    let ids: Vec<_> = workflow.tasks().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["fetch", "build", "report"]);

    let build = &workflow.tasks()[1];
    assert_eq!(build.task_type, "shell");
    assert_eq!(build.needs, vec!["fetch"]);
    assert_eq!(build.max_attempts(), 3);
    assert_eq!(build.retry.and_then(|r| r.backoff_seconds), Some(10));
    assert_eq!(workflow.tasks()[0].max_attempts(), 1);

    let graph = workflow.build_graph()?;
    assert_eq!(graph.roots(), &["fetch".to_string()]);
    Ok(())
}

#[test]
fn omitted_limits_fall_back_to_defaults() -> TestResult {
    let raw = parse_str(
        r#"
        [workflow]
        name = "small"

        [[task]]
        id = "only"
        type = "noop"
        "#,
    )?;

    assert_eq!(raw.limits, DispatchLimits::default());

    let partial = parse_str(
        r#"
        [workflow]
        name = "small"

        [limits]
        max_in_flight_global = 3

        [[task]]
        id = "only"
        type = "noop"
        "#,
    )?;
    assert_eq!(partial.limits, DispatchLimits::new(3, 4));
    Ok(())
}

#[test]
fn unknown_keys_are_rejected_by_the_parser() {
    let err = parse_str(
        r#"
        [workflow]
        name = "typo"

        [[task]]
        id = "a"
        type = "noop"
        depends_on = ["b"]
        "#,
    )
    .unwrap_err();

    assert!(matches!(err, FlowdagError::TomlError(_)), "got {err:?}");
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();

    let err = load_from_path(dir.path().join("absent.toml")).unwrap_err();

    assert!(matches!(err, FlowdagError::IoError(_)));
}

#[test]
fn schema_problems_are_collected_as_diagnostics() {
    let raw = parse_str(
        r#"
        [workflow]
        name = "  "

        [limits]
        max_in_flight_global = 0

        [[task]]
        id = "has space"
        type = ""
        retry = { max = 0 }
        "#,
    )
    .unwrap();

    let diagnostics = validate_raw_workflow(&raw);
    let paths: Vec<_> = diagnostics.iter().map(|d| d.path.as_str()).collect();

    assert_eq!(
        paths,
        vec![
            "workflow.name",
            "limits.max_in_flight_global",
            "task.0.id",
            "task.0.type",
            "task.0.retry.max",
        ]
    );
    assert!(diagnostics.iter().all(|d| d.is_error()));
}

#[test]
fn invalid_file_fails_with_all_diagnostics() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let path = write_workflow(
        &dir,
        r#"
        [workflow]
        name = ""
        "#,
    );

    let err = load_and_validate(&path).unwrap_err();

    match &err {
        FlowdagError::InvalidWorkflow { diagnostics } => {
            assert_eq!(diagnostics.len(), 2);
            assert_eq!(diagnostics[1].path, "task");
        }
        other => panic!("expected InvalidWorkflow, got {other:?}"),
    }
    assert!(err.to_string().contains("2 problem(s)"));

    let rendered = format_diagnostics(&path, err.diagnostics());
    let lines: Vec<_> = rendered.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("workflow.toml: workflow.name: workflow name must not be empty"));
    Ok(())
}

#[test]
fn warnings_alone_do_not_fail_validation() -> TestResult {
    init_tracing();
    let raw = parse_str(
        r#"
        [workflow]
        name = "warned"

        [[task]]
        id = "once"
        type = "noop"
        retry = { max = 1, backoff_seconds = 5 }
        "#,
    )?;

    let diagnostics = validate_raw_workflow(&raw);
    assert_eq!(diagnostics.len(), 1);
    assert!(!diagnostics[0].is_error());
    assert_eq!(diagnostics[0].path, "task.0.retry.backoff_seconds");

    let workflow = flowdag::config::WorkflowFile::try_from(raw)?;
    assert_eq!(workflow.tasks().len(), 1);
    Ok(())
}

#[test]
fn structural_problems_surface_from_build_graph() -> TestResult {
    let dir = TempDir::new()?;
    let path = write_workflow(
        &dir,
        r#"
        [workflow]
        name = "loop"

        [[task]]
        id = "a"
        type = "noop"
        needs = ["b"]

        [[task]]
        id = "b"
        type = "noop"
        needs = ["a"]
        "#,
    );

    let workflow = load_and_validate(&path)?;
    let err = workflow.build_graph().unwrap_err();

    assert!(err.diagnostics()[0].message.contains("a -> b -> a"));
    let rendered = format_diagnostics(&path, err.diagnostics());
    assert!(rendered.contains(": task.0.needs: dependency cycle detected"));
    Ok(())
}

fn noop_registry() -> Arc<ActionRegistry> {
    let mut registry = ActionRegistry::new();
    registry
        .register(Arc::new(FnAction::new("noop", |_task| {
            std::future::ready(TaskOutcome::Success)
        })))
        .expect("register noop");
    Arc::new(registry)
}

#[tokio::test]
async fn run_workflow_file_runs_a_valid_file() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let path = write_workflow(
        &dir,
        r#"
        [workflow]
        name = "ok"

        [[task]]
        id = "first"
        type = "noop"

        [[task]]
        id = "second"
        type = "noop"
        needs = ["first"]
        "#,
    );

    let report = with_timeout(run_workflow_file(&path, "exec-1", noop_registry())).await?;

    assert!(report.succeeded());
    assert_eq!(report.states.len(), 2);
    Ok(())
}

#[tokio::test]
async fn run_workflow_file_rejects_unknown_task_types_before_running() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let path = write_workflow(
        &dir,
        r#"
        [workflow]
        name = "unknown"

        [[task]]
        id = "a"
        type = "noop"

        [[task]]
        id = "b"
        type = "teleport"
        "#,
    );

    let err = with_timeout(run_workflow_file(&path, "exec-1", noop_registry()))
        .await
        .unwrap_err();

    match err {
        FlowdagError::InvalidWorkflow { diagnostics } => {
            assert_eq!(diagnostics.len(), 1);
            assert_eq!(diagnostics[0].path, "task.1.type");
        }
        other => panic!("expected InvalidWorkflow, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn run_workflow_file_rejects_missing_dependencies() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let path = write_workflow(
        &dir,
        r#"
        [workflow]
        name = "dangling"

        [[task]]
        id = "a"
        type = "noop"
        needs = ["ghost"]
        "#,
    );

    let err = with_timeout(run_workflow_file(&path, "exec-1", noop_registry()))
        .await
        .unwrap_err();

    assert!(matches!(err, FlowdagError::Graph(_)), "got {err:?}");
    assert_eq!(err.diagnostics()[0].path, "task.0.needs.0");
    Ok(())
}
