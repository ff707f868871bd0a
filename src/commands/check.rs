//! @acp:module "Check Command"
//! @acp:summary "Detect a stale functions.json by regenerating and diffing"
//! @acp:domain cli
//! @acp:layer handler

use std::path::{Path, PathBuf};

use anyhow::Result;
use console::style;
use similar::{ChangeTag, TextDiff};

use crate::commands::output::print_diagnostics;
use crate::config::Config;
use crate::generate::generate_from_files;

/// Options for the check command
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Source files or directories
    pub inputs: Vec<PathBuf>,
    /// Existing metadata document to compare with
    pub against: PathBuf,
}

/// Execute the check command
pub fn execute_check(options: CheckOptions, config: Config) -> Result<()> {
    let result = generate_from_files(&options.inputs, &config)?;
    print_diagnostics(&result.diagnostics);

    let generated = format!("{}\n", result.document.to_json_pretty()?);
    let current = read_existing(&options.against)?;

    match render_diff(&current, &generated) {
        None => {
            println!(
                "{} {} is up to date",
                style("✓").green(),
                options.against.display()
            );
            Ok(())
        }
        Some(diff) => {
            eprintln!(
                "{} {} is out of date:\n",
                style("✗").red(),
                options.against.display()
            );
            eprint!("{}", diff);
            std::process::exit(1);
        }
    }
}

/// Contents of the existing document; a missing file reads as empty
fn read_existing(path: &Path) -> std::io::Result<String> {
    match std::fs::read_to_string(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        other => other,
    }
}

/// Colored line diff, or None when both texts are identical
pub fn render_diff(current: &str, generated: &str) -> Option<String> {
    if current == generated {
        return None;
    }
    let diff = TextDiff::from_lines(current, generated);
    let mut out = String::new();
    for group in diff.grouped_ops(3) {
        for op in group {
            for change in diff.iter_changes(&op) {
                let line = match change.tag() {
                    ChangeTag::Delete => style(format!("-{}", change)).red().to_string(),
                    ChangeTag::Insert => style(format!("+{}", change)).green().to_string(),
                    ChangeTag::Equal => format!(" {}", change),
                };
                out.push_str(&line);
                if change.missing_newline() {
                    out.push('\n');
                }
            }
        }
        out.push_str(&format!("{}\n", style("...").dim()));
    }
    Some(out)
}
