//! @acp:module "Output Formatting"
//! @acp:summary "Console rendering of diagnostics and run summaries"
//! @acp:domain cli
//! @acp:layer handler

use console::style;

use crate::diagnostic::{Diagnostic, Severity};
use crate::metadata::GenerationResult;

/// Print each diagnostic on stderr, errors in red and warnings in yellow
pub fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        let marker = match diagnostic.severity {
            Severity::Error => style("✗").red(),
            Severity::Warning => style("⚠").yellow(),
        };
        eprintln!("{} {}", marker, diagnostic);
    }
}

/// Counts of a generation run
pub fn print_summary(result: &GenerationResult) {
    println!("  Files: {}", result.inputs.len());
    println!("  Functions: {}", result.document.functions.len());
    println!("  Enums: {}", result.document.enums.len());
    let errors = result.error_count();
    let warnings = result.warning_count();
    if errors > 0 || warnings > 0 {
        println!(
            "  Diagnostics: {} {}, {} {}",
            errors,
            style("errors").red(),
            warnings,
            style("warnings").yellow()
        );
    }
}
