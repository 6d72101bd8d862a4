// src/config/report.rs

use std::path::Path;

use crate::diagnostics::Diagnostic;

/// Render diagnostics as `"<file>: <path>: <message>"`, one per line.
pub fn format_diagnostics(file_path: impl AsRef<Path>, diagnostics: &[Diagnostic]) -> String {
    let file = file_path.as_ref().display();
    diagnostics
        .iter()
        .map(|d| format!("{file}: {}: {}", d.path, d.message))
        .collect::<Vec<_>>()
        .join("\n")
}
