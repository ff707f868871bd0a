//! @acp:module "Validate Command"
//! @acp:summary "Validate a functions.json file against the bundled schema"
//! @acp:domain cli
//! @acp:layer handler

use std::path::PathBuf;

use anyhow::Result;
use console::style;

use crate::error::Error;
use crate::schema;

/// Options for the validate command
#[derive(Debug, Clone)]
pub struct ValidateOptions {
    /// File to validate
    pub file: PathBuf,
}

/// Execute the validate command
pub fn execute_validate(options: ValidateOptions) -> Result<()> {
    let content = std::fs::read_to_string(&options.file)?;

    match schema::validate_metadata(&content) {
        Ok(()) => {
            println!(
                "{} {} is a valid functions.json file",
                style("✓").green(),
                options.file.display()
            );
            Ok(())
        }
        Err(Error::Schema(violations)) => {
            eprintln!(
                "{} {} does not match the schema:",
                style("✗").red(),
                options.file.display()
            );
            for violation in violations.lines() {
                eprintln!("  {}", violation);
            }
            std::process::exit(1);
        }
        Err(other) => Err(other.into()),
    }
}
