//! End-to-end generation tests
//!
//! Source text in, functions.json and diagnostics out.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use cfmeta::{generate_from_files, generate_from_source, Config, Error, GenerationResult, Subject};

fn generate_ts(source: &str) -> GenerationResult {
    generate_from_source(Path::new("functions.ts"), source, &Config::default()).unwrap()
}

fn generate_js(source: &str) -> GenerationResult {
    generate_from_source(Path::new("functions.js"), source, &Config::default()).unwrap()
}

fn document_json(result: &GenerationResult) -> Value {
    serde_json::from_str(&result.document.to_json_pretty().unwrap()).unwrap()
}

fn messages(result: &GenerationResult) -> Vec<String> {
    result.diagnostics.iter().map(|d| d.message.clone()).collect()
}

// =============================================================================
// Basic functions
// =============================================================================

mod basic_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ADD: &str = r#"
/**
 * Adds two numbers.
 * @customfunction
 * @param {number} first First number
 * @param {number} second Second number
 * @returns {number} The sum of the two numbers.
 */
export function add(first: number, second: number): number {
  return first + second;
}

function helper(): number {
  return 42;
}
"#;

    #[test]
    fn test_scalar_number_parameters() {
        let result = generate_ts(ADD);
        assert!(result.diagnostics.is_empty());
        assert_eq!(
            document_json(&result),
            json!({
                "functions": [{
                    "id": "ADD",
                    "name": "ADD",
                    "description": "Adds two numbers.",
                    "parameters": [
                        {
                            "name": "first",
                            "description": "First number",
                            "type": "number",
                            "dimensionality": "scalar",
                            "optional": false
                        },
                        {
                            "name": "second",
                            "description": "Second number",
                            "type": "number",
                            "dimensionality": "scalar",
                            "optional": false
                        }
                    ],
                    "result": { "type": "number" },
                    "options": { "volatile": false, "stream": false, "cancelable": false }
                }]
            })
        );
    }

    #[test]
    fn test_association_table() {
        let result = generate_ts(ADD);
        assert_eq!(result.associations.len(), 1);
        assert_eq!(result.associations[0].function_name, "add");
        assert_eq!(
            result.registration_code(),
            "CustomFunctions.associate(\"ADD\", add);\n"
        );
    }

    #[test]
    fn test_generation_is_idempotent() {
        let first = generate_ts(ADD).document.to_json_pretty().unwrap();
        let second = generate_ts(ADD).document.to_json_pretty().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_id_and_name() {
        let result = generate_ts(
            "/** @customfunction newId newName */\nfunction add(a: number): number { return a; }\n",
        );
        let f = &result.document.functions[0];
        assert_eq!(f.id, "newId");
        assert_eq!(f.name, "newName");
    }

    #[test]
    fn test_default_id_is_uppercased_identifier() {
        let result = generate_ts("/** @customfunction */\nfunction addTwo(a: number): number { return a; }\n");
        let f = &result.document.functions[0];
        assert_eq!(f.id, "ADDTWO");
        assert_eq!(f.name, "ADDTWO");
    }

    #[test]
    fn test_first_help_url_wins() {
        let result = generate_ts(
            r#"
/**
 * @customfunction
 * @helpurl first
 * @helpurl second
 */
function add(a: number): number { return a; }
"#,
        );
        assert_eq!(result.document.functions[0].help_url.as_deref(), Some("first"));
    }

    #[test]
    fn test_syntax_error_is_fatal() {
        let err = generate_from_source(
            Path::new("broken.ts"),
            "/** @customfunction */\nfunction add(a: number {\n",
            &Config::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = generate_from_source(Path::new("functions.py"), "", &Config::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedLanguage(_)));
    }
}

// =============================================================================
// Validation rules
// =============================================================================

mod validation_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_support_sync_with_streaming_rejected() {
        let result = generate_ts(
            r#"
/**
 * @customfunction
 * @supportSync
 * @streaming
 */
export function ticker(invocation: CustomFunctions.StreamingInvocation<number>): void {}
"#,
        );
        assert!(result.document.functions.is_empty());
        assert!(messages(&result)
            .iter()
            .any(|m| m.contains("@supportSync") && m.contains("@streaming")));
    }

    #[test]
    fn test_requires_address_without_invocation() {
        let result = generate_ts(
            r#"
/**
 * @customfunction
 * @requiresAddress
 */
export function address(x: number): string {
  return "A1";
}
"#,
        );
        assert!(result.document.functions.is_empty());
        assert!(messages(&result)
            .iter()
            .any(|m| m.contains("missing invocation parameter")));
    }

    #[test]
    fn test_requires_address_with_invocation() {
        let result = generate_ts(
            r#"
/**
 * @customfunction
 * @requiresAddress
 */
export function address(x: number, invocation: CustomFunctions.Invocation): string {
  return invocation.address;
}
"#,
        );
        assert!(result.diagnostics.is_empty());
        let json = document_json(&result);
        assert_eq!(json["functions"][0]["options"]["requiresAddress"], json!(true));
        assert_eq!(json["functions"][0]["parameters"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let result = generate_ts(
            r#"
/** @customfunction DUPLICATE */
function first(): number { return 1; }

/** @customfunction DUPLICATE */
function second(): number { return 2; }
"#,
        );
        assert_eq!(result.document.functions.len(), 1);
        assert_eq!(result.associations[0].function_name, "first");
        assert!(result.has_errors());
        assert!(messages(&result).iter().any(|m| m.contains("DUPLICATE")));
        assert!(result.diagnostics.iter().all(|d| d.subject_name == "second"));
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let result = generate_ts(
            r#"
/** @customfunction FIRST SAME */
function first(): number { return 1; }

/** @customfunction SECOND SAME */
function second(): number { return 2; }
"#,
        );
        let ids: Vec<&str> = result.document.functions.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["FIRST"]);
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.diagnostics[0].subject_name, "second");
        assert!(result.diagnostics[0].message.contains("Duplicate function name \"SAME\""));
    }

    #[test]
    fn test_nullable_three_dimensional_array_rejected() {
        let result = generate_ts(
            r#"
/** @customfunction */
function cube(values: boolean[][][] | null): number { return 0; }
"#,
        );
        assert!(result.document.functions.is_empty());
        assert!(messages(&result)
            .iter()
            .any(|m| m.contains("Unsupported type for parameter \"values\"")));
    }

    #[test]
    fn test_three_dimensional_array_rejected() {
        let result = generate_ts(
            r#"
/** @customfunction */
function cube(values: boolean[][][]): number { return 0; }
"#,
        );
        assert!(result.document.functions.is_empty());
        assert!(messages(&result)
            .iter()
            .any(|m| m.contains("Unsupported type for parameter \"values\"")));
    }

    #[test]
    fn test_invalid_function_does_not_stop_others() {
        let result = generate_ts(
            r#"
/** @customfunction 9BAD */
function bad(): number { return 1; }

/** @customfunction */
function good(): number { return 1; }
"#,
        );
        let ids: Vec<&str> = result.document.functions.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["GOOD"]);
        assert_eq!(result.error_count(), 2);
        assert_eq!(result.diagnostics[0].file.as_deref(), Some("functions.ts"));
        assert_eq!(result.diagnostics[0].line, 3);
    }

    #[test]
    fn test_untagged_functions_are_silent() {
        let result = generate_ts("/** Just a helper. */\nfunction helper(x: Date): void {}\n");
        assert!(result.document.functions.is_empty());
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_unknown_param_tag_is_warning() {
        let result = generate_ts(
            r#"
/**
 * @customfunction
 * @param {number} missing Not a parameter
 */
function add(a: number): number { return a; }
"#,
        );
        assert_eq!(result.document.functions.len(), 1);
        assert_eq!(result.warning_count(), 1);
        assert!(!result.has_errors());
    }
}

// =============================================================================
// Type resolution through the whole pipeline
// =============================================================================

mod type_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_javascript_jsdoc_types() {
        let result = generate_js(
            r#"
/**
 * Returns a matrix.
 * @customfunction
 * @param {number[][]} grid Values
 * @param {string} [label] Optional label
 * @returns {number[][]} The same values
 */
function echo(grid, label) {
  return grid;
}
"#,
        );
        assert!(result.diagnostics.is_empty());
        let json = document_json(&result);
        let f = &json["functions"][0];
        assert_eq!(f["parameters"][0]["dimensionality"], json!("matrix"));
        assert_eq!(f["parameters"][0]["type"], json!("number"));
        assert_eq!(f["parameters"][1]["optional"], json!(true));
        assert_eq!(f["result"], json!({ "type": "number", "dimensionality": "matrix" }));
    }

    #[test]
    fn test_untyped_javascript_infers_result() {
        let result = generate_js(
            r#"
/** @customfunction */
function isReady(value) {
  if (value) {
    return true;
  }
  return false;
}
"#,
        );
        let json = document_json(&result);
        assert_eq!(json["functions"][0]["parameters"][0]["type"], json!("any"));
        assert_eq!(json["functions"][0]["result"]["type"], json!("boolean"));
    }

    #[test]
    fn test_rest_parameter_repeats_element_type() {
        let result = generate_ts(
            "/** @customfunction */\nfunction sum(...values: number[]): number { return 0; }\n",
        );
        let json = document_json(&result);
        let p = &json["functions"][0]["parameters"][0];
        assert_eq!(p["type"], json!("number"));
        assert_eq!(p["dimensionality"], json!("scalar"));
        assert_eq!(p["repeating"], json!(true));
    }

    #[test]
    fn test_async_promise_result() {
        let result = generate_ts(
            "/** @customfunction */\nasync function fetchPrice(symbol: string): Promise<number> { return 1; }\n",
        );
        assert_eq!(result.document.functions[0].result.kind, "number");
    }

    #[test]
    fn test_streaming_function() {
        let result = generate_ts(
            r#"
/**
 * Counts up.
 * @customfunction
 * @param {number} incrementBy Amount to add
 */
export function increment(
  incrementBy: number,
  invocation: CustomFunctions.StreamingInvocation<number>
): void {
  let result = 0;
  const timer = setInterval(() => {
    result += incrementBy;
    invocation.setResult(result);
    return;
  }, 1000);
}
"#,
        );
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let json = document_json(&result);
        let f = &json["functions"][0];
        assert_eq!(f["result"], json!({ "type": "number" }));
        assert_eq!(f["options"]["stream"], json!(true));
        assert_eq!(f["options"]["cancelable"], json!(true));
        assert_eq!(f["parameters"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_cell_value_types() {
        let result = generate_ts(
            r#"
/** @customfunction */
function describe(value: Excel.EntityCellValue): Excel.CellValue {
  return value;
}
"#,
        );
        let json = document_json(&result);
        let f = &json["functions"][0];
        assert_eq!(f["parameters"][0]["type"], json!("any"));
        assert_eq!(f["parameters"][0]["cellValueType"], json!("entitycellvalue"));
        assert_eq!(f["result"], json!({ "type": "any" }));
    }

    #[test]
    fn test_tuple_rejected() {
        let result = generate_ts(
            "/** @customfunction */\nfunction pair(): [number, string] { return [1, \"a\"]; }\n",
        );
        assert!(result.document.functions.is_empty());
        assert!(messages(&result).iter().any(|m| m.contains("Unsupported result type")));
    }
}

// =============================================================================
// Custom enums
// =============================================================================

mod enum_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_enum_parameter() {
        let result = generate_ts(
            r#"
/**
 * The planets.
 * @customenum {number}
 */
export enum PLANETS {
  /** First planet */
  Mercury = 1,
  Venus,
}

/**
 * @customfunction
 * @param planet The planet
 */
export function distance(planet: PLANETS): number {
  return 1;
}
"#,
        );
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let json = document_json(&result);
        assert_eq!(
            json["enums"],
            json!([{
                "id": "PLANETS",
                "type": "number",
                "values": [
                    { "name": "Mercury", "value": 1, "tooltip": "First planet" },
                    { "name": "Venus", "value": 2 }
                ]
            }])
        );
        let p = &json["functions"][0]["parameters"][0];
        assert_eq!(p["type"], json!("number"));
        assert_eq!(p["customEnumId"], json!("PLANETS"));
        assert_eq!(p["description"], json!("The planet"));
    }

    #[test]
    fn test_invalid_enum_rejects_its_users() {
        let result = generate_ts(
            r#"
/**
 * @customenum {number}
 */
export enum _PLANETS {
  Mercury = 1,
  Venus = 2,
}

/**
 * @customfunction
 * @param {_PLANETS} planet The planet
 */
export function orbit(planet: _PLANETS): number {
  return 0;
}
"#,
        );
        assert!(result.document.functions.is_empty());
        assert!(result.document.enums.is_empty());

        let enum_diag = result
            .diagnostics
            .iter()
            .find(|d| d.subject == Subject::Enum)
            .unwrap();
        assert_eq!(enum_diag.subject_name, "_PLANETS");

        let function_diag = result
            .diagnostics
            .iter()
            .find(|d| d.subject == Subject::Function)
            .unwrap();
        assert_eq!(function_diag.subject_name, "orbit");
        assert!(function_diag.message.contains("\"planet\""));
    }

    #[test]
    fn test_invalid_enum_in_optional_union_rejects_user() {
        let result = generate_ts(
            r#"
/** @customenum {number} */
export enum _PLANETS {
  Mercury = 1,
}

/** @customfunction */
export function orbit(planet?: _PLANETS | undefined): number {
  return 0;
}
"#,
        );
        assert!(result.document.functions.is_empty());
        let function_diag = result
            .diagnostics
            .iter()
            .find(|d| d.subject == Subject::Function)
            .unwrap();
        assert_eq!(function_diag.subject_name, "orbit");
        assert!(function_diag.message.contains("invalid"));
    }

    #[test]
    fn test_enum_arrays_rejected() {
        let result = generate_ts(
            r#"
/** @customenum {number} */
export enum Planets {
  Mercury = 1,
}

/** @customfunction */
export function orbits(planets: Planets[][]): number {
  return 0;
}
"#,
        );
        assert!(result.document.functions.is_empty());
        assert_eq!(result.document.enums.len(), 1);
        assert!(messages(&result)
            .iter()
            .any(|m| m.contains("not a valid array element type")));
    }

    #[test]
    fn test_string_enum() {
        let result = generate_ts(
            r#"
/** @customenum {string} */
enum Colors {
  Red = "red",
  Blue = "blue",
}
"#,
        );
        let json = document_json(&result);
        assert_eq!(json["enums"][0]["type"], json!("string"));
        assert_eq!(json["enums"][0]["values"][1]["value"], json!("blue"));
    }
}

// =============================================================================
// Multiple files
// =============================================================================

mod file_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_merge_across_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.ts");
        let b = dir.path().join("b.js");
        std::fs::write(&a, "/** @customfunction */\nfunction add(x: number): number { return x; }\n").unwrap();
        std::fs::write(
            &b,
            "/** @customfunction ADD */\nfunction plus(x) { return x; }\n/** @customfunction */\nfunction sub(x) { return x; }\n",
        )
        .unwrap();

        let result = generate_from_files(&[a, b], &Config::default()).unwrap();
        let ids: Vec<&str> = result.document.functions.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["ADD", "SUB"]);
        assert!(result.has_errors());
        assert!(result.diagnostics[0].file.as_deref().unwrap().ends_with("b.js"));
    }

    #[test]
    fn test_directory_input() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(
            dir.path().join("src/functions.ts"),
            "/** @customfunction */\nfunction add(x: number): number { return x; }\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("src/notes.txt"), "not source").unwrap();

        let inputs: Vec<PathBuf> = vec![dir.path().to_path_buf()];
        let result = generate_from_files(&inputs, &Config::default()).unwrap();
        assert_eq!(result.document.functions.len(), 1);
        assert_eq!(result.inputs.len(), 1);
    }

    #[test]
    fn test_document_flags_from_config() {
        let mut config = Config::default();
        config.metadata.allow_error_for_data_type_any = true;
        let result = generate_from_source(Path::new("f.ts"), "", &config).unwrap();
        assert_eq!(
            document_json(&result),
            json!({ "allowErrorForDataTypeAny": true, "functions": [] })
        );
    }

    #[test]
    fn test_written_document_passes_schema() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("functions.json");
        let result = generate_ts(
            "/**\n * @customfunction\n * @volatile\n */\nfunction now(): number { return 1; }\n",
        );
        result.document.write_json(&output).unwrap();
        let content = std::fs::read_to_string(&output).unwrap();
        assert!(cfmeta::schema::validate_metadata(&content).is_ok());
        assert!(content.ends_with("}\n"));
    }
}
