// src/dispatch/mod.rs

//! Concurrency-limited task dispatch.
//!
//! - [`in_flight`] is the membership ledger of dispatched, not-yet-completed
//!   tasks.
//! - [`dispatcher`] turns a runnable set into the subset actually launched
//!   this tick, honouring global and per-execution ceilings.

pub mod dispatcher;
pub mod in_flight;

pub use dispatcher::{scheduler_tick, DispatchLimits, Dispatcher, SharedDispatcher};
pub use in_flight::InFlightSet;
