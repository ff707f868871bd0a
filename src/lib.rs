#![forbid(unsafe_code)]

//! @acp:module "cfmeta Library"
//! @acp:summary "Generates spreadsheet custom functions metadata from annotated source"
//! @acp:domain cli
//! @acp:layer api
//! @acp:stability stable
//!
//! # cfmeta
//!
//! Reads JSDoc-annotated TypeScript or JavaScript, finds every function
//! tagged `@customfunction` and emits the host's `functions.json` document
//! plus the `CustomFunctions.associate` registration table.
//!
//! ## Features
//!
//! - **Fast Parsing**: tree-sitter front end for both dialects
//! - **Per-function errors**: invalid declarations are reported, never fatal
//! - **Custom enums**: `@customenum` declarations become `enums` entries
//! - **Schema check**: output validated against the bundled JSON Schema
//!
//! ## Example
//!
//! ```rust,no_run
//! use cfmeta::{generate_from_files, Config};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let result = generate_from_files(&["src/functions.ts".into()], &config)?;
//!
//!     for diagnostic in &result.diagnostics {
//!         eprintln!("{}", diagnostic);
//!     }
//!     result.document.write_json("functions.json")?;
//!
//!     Ok(())
//! }
//! ```

pub mod ast;
pub mod commands;
pub mod config;
pub mod diagnostic;
pub mod enums;
pub mod error;
pub mod generate;
pub mod metadata;
pub mod parse;
pub mod schema;
pub mod signature;
pub mod source;
pub mod types;
pub mod validate;

// Re-exports
pub use ast::AstParser;
pub use config::Config;
pub use diagnostic::{Diagnostic, Severity, Subject};
pub use enums::{EnumDescriptor, EnumRegistry, RegisteredEnum};
pub use error::{Error, Result};
pub use generate::{generate_from_files, generate_from_source, Generator};
pub use metadata::{Association, GenerationResult, MetadataAssembler, MetadataDocument};
pub use parse::{parse_tags, ParsedTag, SystemTag, TagSet};
pub use signature::{FunctionDescriptor, ParameterDescriptor, SignatureExtractor};
pub use source::{Language, SourceUnit};
pub use types::{TypeDescriptor, TypeExpr, TypeResolver};
pub use validate::{Review, ValidationState, Validator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
