// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of running tasks
//! itself. Production code uses [`ActionExecutor`](super::ActionExecutor),
//! which resolves each task's `type` to a registered
//! [`Action`](super::Action); tests provide their own backend that records
//! dispatches and emits `TaskCompleted` events directly.

use std::future::Future;
use std::pin::Pin;

use crate::engine::DispatchedTask;
use crate::errors::Result;

/// Trait abstracting how dispatched tasks are executed.
///
/// Implementations report each finished attempt by sending
/// [`RuntimeEvent::TaskCompleted`](crate::engine::RuntimeEvent::TaskCompleted)
/// on the runtime's channel. They must not block waiting for the attempt to
/// finish: the returned future should resolve once the tasks are handed off.
pub trait ExecutorBackend: Send {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<DispatchedTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}
