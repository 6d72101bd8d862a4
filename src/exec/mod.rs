// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`backend`] provides the `ExecutorBackend` trait the runtime dispatches
//!   through.
//! - [`action`] holds the action plugin surface and `ActionExecutor`, the
//!   production backend that runs registered actions on Tokio tasks.

pub mod action;
pub mod backend;

pub use action::{Action, ActionExecutor, ActionFuture, ActionRegistry, FnAction};
pub use backend::ExecutorBackend;
