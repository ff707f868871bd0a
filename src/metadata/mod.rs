//! @acp:module "Metadata Assembler"
//! @acp:summary "Collects accepted functions into the metadata document and association table"
//! @acp:domain cli
//! @acp:layer service
//!
//! - [`types`]: serialized form of `functions.json`
//! - [`MetadataAssembler`]: per-unit accumulation in source order
//! - [`GenerationResult::merge`]: combines per-file results in input order

pub mod types;

pub use types::{
    EnumMetadata, EnumValueMetadata, FunctionMetadata, MetadataDocument, ParameterMetadata,
    ResultMetadata,
};

use std::collections::HashSet;

use serde::Serialize;

use crate::diagnostic::{tally, Diagnostic, Subject};
use crate::enums::EnumRegistry;
use crate::signature::FunctionDescriptor;
use crate::validate::DuplicateTracker;

/// @acp:summary "Maps a function id to the code that registers its implementation"
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Association {
    pub id: String,
    pub function_name: String,
}

impl Association {
    /// `CustomFunctions.associate("ID", functionName);`
    pub fn call_expression(&self) -> String {
        format!(
            "CustomFunctions.associate({}, {});",
            serde_json::Value::String(self.id.clone()),
            self.function_name
        )
    }
}

/// @acp:summary "Everything produced by one generation run"
#[derive(Debug, Clone, Default)]
pub struct GenerationResult {
    pub document: MetadataDocument,
    /// Parallel to `document.functions`
    pub associations: Vec<Association>,
    pub diagnostics: Vec<Diagnostic>,
    /// Input files that contributed to this result
    pub inputs: Vec<String>,
}

impl GenerationResult {
    pub fn error_count(&self) -> usize {
        tally(&self.diagnostics).0
    }

    pub fn warning_count(&self) -> usize {
        tally(&self.diagnostics).1
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// @acp:summary "Registration calls for every accepted function, one per line"
    pub fn registration_code(&self) -> String {
        self.associations
            .iter()
            .map(|a| format!("{}\n", a.call_expression()))
            .collect()
    }

    /// @acp:summary "Merge per-file results in order, rejecting cross-file duplicates"
    /// The first file to claim an id, name or enum id keeps it.
    pub fn merge(results: impl IntoIterator<Item = GenerationResult>) -> GenerationResult {
        let mut merged = GenerationResult::default();
        let mut tracker = DuplicateTracker::new();
        let mut enum_ids: HashSet<String> = HashSet::new();

        for result in results {
            let file = result.inputs.first().cloned();
            merged.document.allow_custom_data_for_data_type_any |=
                result.document.allow_custom_data_for_data_type_any;
            merged.document.allow_error_for_data_type_any |=
                result.document.allow_error_for_data_type_any;
            merged.diagnostics.extend(result.diagnostics);
            merged.inputs.extend(result.inputs);

            for (function, association) in result
                .document
                .functions
                .into_iter()
                .zip(result.associations)
            {
                let conflicts = tracker.conflicts(&function.id, &function.name);
                if conflicts.is_empty() {
                    tracker.record(&function.id, &function.name, &association.function_name);
                    merged.document.functions.push(function);
                    merged.associations.push(association);
                    continue;
                }
                tracing::warn!("Dropping {} declared in another file as well", function.id);
                for message in conflicts {
                    let mut diagnostic =
                        Diagnostic::error(Subject::Function, &association.function_name, message);
                    if let Some(file) = &file {
                        diagnostic = diagnostic.in_file(file.clone());
                    }
                    merged.diagnostics.push(diagnostic);
                }
            }

            for custom_enum in result.document.enums {
                if enum_ids.insert(custom_enum.id.to_lowercase()) {
                    merged.document.enums.push(custom_enum);
                    continue;
                }
                let mut diagnostic = Diagnostic::error(
                    Subject::Enum,
                    &custom_enum.id,
                    format!("Duplicate custom enum name \"{}\"", custom_enum.id),
                );
                if let Some(file) = &file {
                    diagnostic = diagnostic.in_file(file.clone());
                }
                merged.diagnostics.push(diagnostic);
            }
        }

        merged
    }
}

/// @acp:summary "Incremental document construction for one source unit"
#[derive(Debug, Default)]
pub struct MetadataAssembler {
    result: GenerationResult,
}

impl MetadataAssembler {
    pub fn new(allow_custom_data: bool, allow_error: bool) -> Self {
        let mut result = GenerationResult::default();
        result.document.allow_custom_data_for_data_type_any = allow_custom_data;
        result.document.allow_error_for_data_type_any = allow_error;
        Self { result }
    }

    /// Append an accepted function and its association
    pub fn accept(&mut self, function: &FunctionDescriptor) {
        self.result.document.functions.push(FunctionMetadata::from(function));
        self.result.associations.push(Association {
            id: function.id.clone(),
            function_name: function.code_name.clone(),
        });
    }

    pub fn add_enums(&mut self, registry: &EnumRegistry) {
        self.result
            .document
            .enums
            .extend(registry.valid().map(EnumMetadata::from));
    }

    pub fn add_diagnostics(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.result.diagnostics.extend(diagnostics);
    }

    pub fn add_input(&mut self, input: impl Into<String>) {
        self.result.inputs.push(input.into());
    }

    pub fn build(self) -> GenerationResult {
        self.result
    }
}
