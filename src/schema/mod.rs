//! @acp:module "Schema Validation"
//! @acp:summary "Checks functions.json documents against the bundled JSON Schema"
//! @acp:domain cli
//! @acp:layer service

use std::sync::LazyLock;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::metadata::MetadataDocument;

/// Bundled schema text
pub static FUNCTIONS_SCHEMA: &str = include_str!("../../schemas/functions.schema.json");

static SCHEMA_VALUE: LazyLock<Value> =
    LazyLock::new(|| serde_json::from_str(FUNCTIONS_SCHEMA).unwrap());

/// @acp:summary "All schema violations of a JSON value, as `path: message` lines"
pub fn schema_errors(instance: &Value) -> Result<Vec<String>> {
    let validator = jsonschema::validator_for(&SCHEMA_VALUE)
        .map_err(|e| Error::Schema(format!("Invalid bundled schema: {}", e)))?;
    Ok(validator
        .iter_errors(instance)
        .map(|err| {
            let path = err.instance_path.to_string();
            if path.is_empty() {
                err.to_string()
            } else {
                format!("{}: {}", path, err)
            }
        })
        .collect())
}

/// @acp:summary "Validate JSON text against the functions.json schema"
pub fn validate_metadata(content: &str) -> Result<()> {
    let instance: Value = serde_json::from_str(content)?;
    let errors = schema_errors(&instance)?;
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Schema(errors.join("\n")))
    }
}

/// @acp:summary "Validate a generated document"
pub fn validate_document(document: &MetadataDocument) -> Result<()> {
    let instance = serde_json::to_value(document)?;
    let errors = schema_errors(&instance)?;
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Schema(errors.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_document_is_valid() {
        assert!(validate_metadata(r#"{ "functions": [] }"#).is_ok());
        assert!(validate_document(&MetadataDocument::default()).is_ok());
    }

    #[test]
    fn test_violations_are_reported() {
        let err = validate_metadata(
            r#"{ "functions": [ { "id": "1BAD", "name": "ok", "parameters": [], "result": { "type": "date" }, "options": {} } ] }"#,
        )
        .unwrap_err();
        match err {
            Error::Schema(message) => {
                assert!(message.contains("/functions/0/id"));
                assert!(message.contains("/functions/0/result/type"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(validate_metadata("{"), Err(Error::Json(_))));
    }
}
