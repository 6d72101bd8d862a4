// src/config/mod.rs

//! Workflow definition files.
//!
//! - [`model`] mirrors the TOML layout.
//! - [`validate`] performs field-level checks and produces diagnostics.
//! - [`loader`] reads files from disk.
//! - [`report`] renders diagnostics for display.

pub mod loader;
pub mod model;
pub mod report;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, parse_str};
pub use model::{RawWorkflowFile, WorkflowFile, WorkflowSection};
pub use report::format_diagnostics;
pub use validate::validate_raw_workflow;
