// src/engine/runtime.rs

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::core::CoreRuntime;
use crate::engine::{ExecutionOutcome, ExecutionProgress, ExecutionReport, RuntimeEvent};
use crate::errors::Result;
use crate::exec::ExecutorBackend;

/// Knobs for the async driver loop.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// How long to wait before re-ticking when runnable tasks exist but the
    /// dispatcher has no capacity for them (another execution holds it).
    pub capacity_poll_interval: Duration,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            capacity_poll_interval: Duration::from_millis(50),
        }
    }
}

/// Drives one execution to completion.
///
/// Each turn of the loop ticks the core, hands dispatched tasks to the
/// executor, then waits for the next completion (or for a retry backoff to
/// elapse) and folds it back into the core.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    options: RuntimeOptions,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self::with_options(core, event_rx, executor, RuntimeOptions::default())
    }

    pub fn with_options(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            core,
            event_rx,
            executor,
            options,
        }
    }

    /// Main loop. Returns once the execution succeeded, can make no further
    /// progress, or was shut down.
    ///
    /// Exhausted retries produce `Ok` with [`ExecutionOutcome::Failed`];
    /// `Err` is reserved for executor and bookkeeping failures. Dispatcher
    /// slots still held by the execution are released before returning,
    /// including on the error path.
    pub async fn run(mut self) -> Result<ExecutionReport> {
        info!(execution = %self.core.execution_id(), "runtime started");

        let result = self.drive().await;

        let released = self.core.release_in_flight();
        if released > 0 {
            debug!(released, "released dispatcher slots of abandoned tasks");
        }

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(
                    execution = %self.core.execution_id(),
                    error = %err,
                    "runtime aborted"
                );
                return Err(err);
            }
        };

        info!(
            execution = %self.core.execution_id(),
            ?outcome,
            "runtime exiting"
        );

        Ok(ExecutionReport {
            execution: self.core.execution_id().to_string(),
            outcome,
            states: self.core.run_states().to_vec(),
        })
    }

    async fn drive(&mut self) -> Result<ExecutionOutcome> {
        loop {
            let dispatched = self.core.tick(Utc::now())?;
            if !dispatched.is_empty() {
                let ids: Vec<_> = dispatched.iter().map(|t| t.task_id.as_str()).collect();
                debug!(?ids, "handing tasks to executor");
                self.executor.spawn_ready_tasks(dispatched).await?;
            }

            let now = Utc::now();
            let until_retry = |at: DateTime<Utc>| (at - now).to_std().unwrap_or(Duration::ZERO);

            let wait = match self.core.progress(now) {
                ExecutionProgress::Succeeded => return Ok(ExecutionOutcome::Succeeded),
                ExecutionProgress::Failed { exhausted, blocked } => {
                    return Ok(ExecutionOutcome::Failed { exhausted, blocked });
                }
                ExecutionProgress::WaitingForRetry { until } => Some(until_retry(until)),
                ExecutionProgress::Running => {
                    let retry = self.core.next_retry_after(now).map(until_retry);
                    if self.core.in_flight() == 0 {
                        let poll = self.options.capacity_poll_interval;
                        Some(retry.map_or(poll, |r| r.min(poll)))
                    } else {
                        retry
                    }
                }
            };

            let event = match wait {
                None => self.event_rx.recv().await,
                Some(delay) => {
                    debug!(?delay, "waiting for completion or timer");
                    tokio::select! {
                        event = self.event_rx.recv() => event,
                        _ = tokio::time::sleep(delay) => continue,
                    }
                }
            };

            match event {
                Some(RuntimeEvent::TaskCompleted { task, outcome }) => {
                    self.core.complete(&task, outcome, Utc::now())?;
                }
                Some(RuntimeEvent::ShutdownRequested) => {
                    info!("shutdown requested; stopping runtime");
                    return Ok(ExecutionOutcome::Cancelled);
                }
                None => {
                    info!("runtime event channel closed; exiting");
                    return Ok(ExecutionOutcome::Cancelled);
                }
            }
        }
    }
}
