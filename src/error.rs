//! @acp:module "Errors"
//! @acp:summary "Fatal error types for metadata generation"
//! @acp:domain cli
//! @acp:layer model
//!
//! Only failures that stop a whole run live here. Problems with a single
//! function or enum are reported as [`crate::diagnostic::Diagnostic`]s instead.

use std::path::PathBuf;

use thiserror::Error;

/// @acp:summary "Fatal errors surfaced to the caller"
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported source file extension: {0}")]
    UnsupportedLanguage(String),

    #[error("Failed to load grammar: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),

    #[error("Failed to parse {path}: syntax error at line {line}")]
    Parse { path: PathBuf, line: usize },

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("No input files matched")]
    NoInputs,

    #[error("Metadata does not match schema: {0}")]
    Schema(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
