//! @acp:module "Generate Command"
//! @acp:summary "Generate functions.json and registration code from source files"
//! @acp:domain cli
//! @acp:layer handler
//!
//! Implements `cfmeta generate`. Valid metadata is written even when some
//! functions were rejected; the exit status reports the rejections.

use std::path::{Path, PathBuf};

use anyhow::Result;
use console::style;

use crate::commands::output::{print_diagnostics, print_summary};
use crate::config::Config;
use crate::generate::generate_from_files;
use crate::schema;

/// Options for the generate command
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Source files or directories
    pub inputs: Vec<PathBuf>,
    /// Metadata output path, overriding the config
    pub output: Option<PathBuf>,
    /// Registration code output path, overriding the config
    pub code: Option<PathBuf>,
}

/// Execute the generate command
pub fn execute_generate(options: GenerateOptions, config: Config) -> Result<()> {
    println!("{} Generating custom functions metadata...", style("→").cyan());

    let result = generate_from_files(&options.inputs, &config)?;
    print_diagnostics(&result.diagnostics);

    let errors = result.error_count();
    if errors > config.error_handling.max_errors {
        eprintln!(
            "{} {} errors exceed the limit of {}; no output written",
            style("✗").red(),
            errors,
            config.error_handling.max_errors
        );
        std::process::exit(1);
    }

    if config.validate_output {
        schema::validate_document(&result.document)?;
        println!("{} Metadata matches the functions.json schema", style("✓").green());
    }

    let output = options.output.unwrap_or_else(|| config.output.metadata.clone());
    create_parent(&output)?;
    result.document.write_json(&output)?;
    println!("{} Metadata written to {}", style("✓").green(), output.display());

    if let Some(code) = options.code.or_else(|| config.output.code.clone()) {
        create_parent(&code)?;
        std::fs::write(&code, result.registration_code())?;
        println!("{} Registration code written to {}", style("✓").green(), code.display());
    }

    print_summary(&result);

    let failed = result.has_errors() || (config.is_strict() && result.warning_count() > 0);
    if failed {
        eprintln!(
            "{} Some declarations were rejected; see diagnostics above",
            style("✗").red()
        );
        std::process::exit(1);
    }

    Ok(())
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
