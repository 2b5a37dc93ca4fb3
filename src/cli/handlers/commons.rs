// src/cli/handlers/commons.rs

// Output helpers shared by the handlers.

use crate::models::{Diagnostic, Severity};
use colored::Colorize;
use std::path::Path;

/// Prints one diagnostic, prefixed by the template it belongs to.
pub fn print_diagnostic(template: &Path, diagnostic: &Diagnostic) {
    let label = match diagnostic.severity {
        Severity::Warning => "warning".yellow().bold(),
        Severity::Error => "error".red().bold(),
    };
    eprintln!(
        "  {}: {} ({})",
        label,
        diagnostic.message,
        template.display().to_string().dimmed()
    );
}

/// A check mark or cross for per-item status lines.
pub fn status_mark(ok: bool) -> colored::ColoredString {
    if ok { "✔".green() } else { "✘".red() }
}
