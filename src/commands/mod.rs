//! @acp:module "Commands"
//! @acp:summary "CLI command implementations"
//! @acp:domain cli
//! @acp:layer handler
//!
//! Each command is in its own submodule and takes an options struct plus
//! the loaded [`crate::config::Config`].

pub mod check;
pub mod generate;
pub mod output;
pub mod validate;

pub use check::{execute_check, CheckOptions};
pub use generate::{execute_generate, GenerateOptions};
pub use output::{print_diagnostics, print_summary};
pub use validate::{execute_validate, ValidateOptions};
