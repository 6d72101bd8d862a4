use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use flowdag::engine::{DispatchedTask, RuntimeEvent, TaskOutcome};
use flowdag::errors::Result;
use flowdag::exec::ExecutorBackend;
use tokio::sync::mpsc;

/// A fake executor that:
/// - records which tasks were "run", in dispatch order
/// - fails chosen tasks a chosen number of times, then succeeds
/// - reports completion immediately, or after `delay` on a spawned task
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    dispatches: Arc<Mutex<Vec<(String, u32, Instant)>>>,
    failures: HashMap<String, u32>,
    delay: Option<Duration>,
    task_delays: HashMap<String, Duration>,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            runtime_tx,
            executed: Arc::new(Mutex::new(Vec::new())),
            dispatches: Arc::new(Mutex::new(Vec::new())),
            failures: HashMap::new(),
            delay: None,
            task_delays: HashMap::new(),
            running: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail the first `times` attempts of `task`.
    pub fn failing(mut self, task: &str, times: u32) -> Self {
        self.failures.insert(task.to_string(), times);
        self
    }

    /// Complete every attempt after `delay` instead of immediately.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Complete attempts of `task` after `delay`, overriding `with_delay`.
    pub fn with_task_delay(mut self, task: &str, delay: Duration) -> Self {
        self.task_delays.insert(task.to_string(), delay);
        self
    }

    /// Shared log of `(task, attempt, dispatched at)`.
    pub fn dispatches(&self) -> Arc<Mutex<Vec<(String, u32, Instant)>>> {
        Arc::clone(&self.dispatches)
    }

    /// Shared log of executed task ids.
    pub fn executed(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.executed)
    }

    /// Highest number of attempts observed running at once.
    pub fn peak_concurrency(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.peak)
    }

    fn outcome_for(&mut self, task: &DispatchedTask) -> TaskOutcome {
        match self.failures.get_mut(&task.task_id) {
            Some(left) if *left > 0 => {
                *left -= 1;
                TaskOutcome::failed(format!("scripted failure (attempt {})", task.attempt))
            }
            _ => TaskOutcome::Success,
        }
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<DispatchedTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for t in tasks {
                self.executed.lock().unwrap().push(t.task_id.clone());
                self.dispatches
                    .lock()
                    .unwrap()
                    .push((t.task_id.clone(), t.attempt, Instant::now()));

                let outcome = self.outcome_for(&t);
                let tx = self.runtime_tx.clone();
                let event = RuntimeEvent::TaskCompleted {
                    task: t.task_id.clone(),
                    outcome,
                };

                let now_running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now_running, Ordering::SeqCst);

                match self.task_delays.get(&t.task_id).copied().or(self.delay) {
                    None => {
                        self.running.fetch_sub(1, Ordering::SeqCst);
                        tx.send(event).await.map_err(anyhow::Error::from)?;
                    }
                    Some(delay) => {
                        let running = Arc::clone(&self.running);
                        tokio::spawn(async move {
                            tokio::time::sleep(delay).await;
                            running.fetch_sub(1, Ordering::SeqCst);
                            let _ = tx.send(event).await;
                        });
                    }
                }
            }
            Ok(())
        })
    }
}
