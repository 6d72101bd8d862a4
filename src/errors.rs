// src/errors.rs

//! Crate-wide error types and aliases.

use thiserror::Error;

use crate::diagnostics::Diagnostic;

#[derive(Error, Debug)]
pub enum FlowdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid workflow definition ({} problem(s))", .diagnostics.len())]
    InvalidWorkflow { diagnostics: Vec<Diagnostic> },

    #[error(transparent)]
    Graph(#[from] GraphValidationError),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FlowdagError {
    /// Diagnostics carried by validation failures; empty for other variants.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            FlowdagError::InvalidWorkflow { diagnostics } => diagnostics,
            FlowdagError::Graph(err) => err.diagnostics(),
            _ => &[],
        }
    }
}

/// Structural problem(s) with a task dependency graph.
///
/// Always carries at least one diagnostic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "invalid workflow graph ({} problem(s)): {}",
    .diagnostics.len(),
    first_message(.diagnostics)
)]
pub struct GraphValidationError {
    diagnostics: Vec<Diagnostic>,
}

impl GraphValidationError {
    pub(crate) fn new(diagnostics: Vec<Diagnostic>) -> Self {
        debug_assert!(!diagnostics.is_empty());
        Self { diagnostics }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

fn first_message(diagnostics: &[Diagnostic]) -> &str {
    diagnostics
        .first()
        .map(|d| d.message.as_str())
        .unwrap_or("no details")
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, FlowdagError>;
