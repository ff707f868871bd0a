//! @acp:module "Generator"
//! @acp:summary "Runs the metadata pipeline over source files"
//! @acp:domain cli
//! @acp:layer service
//!
//! Per unit: enums are registered first, then every function declaration
//! goes through tag parsing, type resolution, signature extraction and
//! validation before the assembler accepts or rejects it. Files are processed
//! in parallel and merged in input order, so output does not depend on
//! scheduling.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::ast::AstParser;
use crate::config::Config;
use crate::enums::EnumRegistry;
use crate::error::{Error, Result};
use crate::metadata::{GenerationResult, MetadataAssembler};
use crate::signature::SignatureExtractor;
use crate::source::SourceUnit;
use crate::types::TypeResolver;
use crate::validate::Validator;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// @acp:summary "Metadata generator with parallel file processing"
pub struct Generator {
    config: Config,
    parser: AstParser,
}

impl Generator {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            parser: AstParser::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// @acp:summary "Run the core pipeline over one parsed unit"
    pub fn generate_unit(&self, unit: &SourceUnit) -> GenerationResult {
        let file = unit.display_path();
        let metadata = &self.config.metadata;
        let mut assembler = MetadataAssembler::new(
            metadata.allow_custom_data_for_data_type_any,
            metadata.allow_error_for_data_type_any,
        );
        assembler.add_input(file.clone());

        let (registry, enum_diagnostics) = EnumRegistry::scan(unit);
        assembler.add_diagnostics(enum_diagnostics);

        let extractor = SignatureExtractor::new(TypeResolver::new(&registry));
        let mut validator = Validator::new();

        for decl in &unit.functions {
            let Some(candidate) = extractor.extract(decl) else {
                continue;
            };
            let review = validator.review(candidate);
            if review.is_accepted() {
                assembler.accept(&review.function);
            }
            assembler.add_diagnostics(
                review
                    .diagnostics
                    .into_iter()
                    .map(|d| if d.file.is_none() { d.in_file(file.clone()) } else { d }),
            );
        }

        assembler.add_enums(&registry);
        assembler.build()
    }

    /// @acp:summary "Parse and process in-memory source text"
    pub fn generate_source(&self, path: &Path, text: &str) -> Result<GenerationResult> {
        let unit = self.parser.parse_file(path, text)?;
        let result = self.generate_unit(&unit);
        tracing::info!(
            "Processed {}: {} functions, {} diagnostics",
            path.display(),
            result.document.functions.len(),
            result.diagnostics.len()
        );
        Ok(result)
    }

    /// @acp:summary "Process files and directories, merging results in input order"
    /// Any file that fails to parse aborts the run; no partial document is returned.
    pub fn generate_files(&self, inputs: &[PathBuf]) -> Result<GenerationResult> {
        let files = self.expand_inputs(inputs)?;
        if files.is_empty() {
            return Err(Error::NoInputs);
        }

        let max_bytes = (self.config.limits.max_file_size_mb as u64) * 1024 * 1024;

        let results: Vec<GenerationResult> = files
            .par_iter()
            .filter_map(|path| match std::fs::metadata(path) {
                Ok(meta) if meta.len() > max_bytes => {
                    tracing::warn!(
                        "Skipping {} ({} bytes exceeds the size limit)",
                        path.display(),
                        meta.len()
                    );
                    None
                }
                Ok(_) => Some(
                    std::fs::read_to_string(path)
                        .map_err(Error::from)
                        .and_then(|text| self.generate_source(path, &text)),
                ),
                Err(e) => Some(Err(Error::from(e))),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(GenerationResult::merge(results))
    }

    /// Directories expand to matching files in sorted order; files pass through
    fn expand_inputs(&self, inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for input in inputs {
            if input.is_dir() {
                files.extend(self.find_files(input)?);
            } else {
                files.push(input.clone());
            }
        }
        Ok(files)
    }

    /// @acp:summary "Find all files matching include/exclude patterns"
    fn find_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let include_patterns = compile_patterns(&self.config.include)?;
        let exclude_patterns = compile_patterns(&self.config.exclude)?;

        let files = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                let relative_path = e
                    .path()
                    .strip_prefix(root)
                    .unwrap_or(e.path())
                    .to_string_lossy()
                    .replace('\\', "/");
                let included = include_patterns.is_empty()
                    || include_patterns
                        .iter()
                        .any(|p| p.matches_with(&relative_path, MATCH_OPTIONS));
                let excluded = exclude_patterns
                    .iter()
                    .any(|p| p.matches_with(&relative_path, MATCH_OPTIONS));
                included && !excluded
            })
            .map(|e| e.into_path())
            .collect::<Vec<_>>();

        tracing::debug!("Found {} source files under {}", files.len(), root.display());
        Ok(files)
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| Pattern::new(p).map_err(Error::from))
        .collect()
}

/// @acp:summary "Generate metadata for one in-memory source file"
pub fn generate_from_source(path: &Path, text: &str, config: &Config) -> Result<GenerationResult> {
    Generator::new(config.clone()).generate_source(path, text)
}

/// @acp:summary "Generate merged metadata for files and directories"
pub fn generate_from_files(inputs: &[PathBuf], config: &Config) -> Result<GenerationResult> {
    Generator::new(config.clone()).generate_files(inputs)
}
