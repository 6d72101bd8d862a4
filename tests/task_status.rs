// tests/task_status.rs

use flowdag::dag::TaskRunState;
use flowdag::types::{max_attempts_for, RetryPolicy, TaskStatus};
use flowdag_test_utils::builders::{at, t0};

#[test]
fn status_round_trips_through_its_text_form() {
    for status in [
        TaskStatus::Pending,
        TaskStatus::Running,
        TaskStatus::Success,
        TaskStatus::Failed,
    ] {
        assert_eq!(status.to_string().parse::<TaskStatus>(), Ok(status));
    }
    assert!("done".parse::<TaskStatus>().is_err());
    assert_eq!(TaskStatus::default(), TaskStatus::Pending);
}

#[test]
fn missing_or_zero_retry_policy_means_one_attempt() {
    assert_eq!(max_attempts_for(None), 1);
    assert_eq!(max_attempts_for(Some(&RetryPolicy::new(0))), 1);
    assert_eq!(max_attempts_for(Some(&RetryPolicy::with_backoff(4, 2))), 4);
}

#[test]
fn retry_eligibility_needs_failure_attempts_and_elapsed_backoff() {
    let failed = TaskRunState::pending("t", 2)
        .with_status(TaskStatus::Failed)
        .with_attempts(1);

    assert!(failed.retry_eligible(t0()));
    assert!(!failed.clone().with_next_eligible_at(at(10)).retry_eligible(at(9)));
    assert!(failed.clone().with_next_eligible_at(at(10)).retry_eligible(at(10)));
    assert!(!failed.clone().with_attempts(2).retry_eligible(at(100)));
    assert!(!failed.with_status(TaskStatus::Pending).retry_eligible(t0()));
}

#[test]
fn run_state_serializes_with_lowercase_status() {
    let state = TaskRunState::pending("t", 3).with_status(TaskStatus::Running);

    let text = toml::to_string(&state).expect("serialize");

    assert!(text.contains("status = \"running\""), "{text}");
    let back: TaskRunState = toml::from_str(&text).expect("deserialize");
    assert_eq!(back, state);
}
