//! @acp:module "Metadata Types"
//! @acp:summary "Data structures matching the host functions.json format"
//! @acp:domain cli
//! @acp:layer model
//!
//! Field names and nesting are the host loader's contract; every optional
//! field is skipped rather than written as `null`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::enums::{EnumDescriptor, EnumValue};
use crate::error::Result;
use crate::signature::{FunctionDescriptor, FunctionOptions, ParameterDescriptor};
use crate::types::{Dimensionality, EnumBaseType, TypeDescriptor};

fn is_false(value: &bool) -> bool {
    !*value
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// @acp:summary "Complete functions.json document"
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataDocument {
    #[serde(skip_serializing_if = "is_false")]
    pub allow_custom_data_for_data_type_any: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub allow_error_for_data_type_any: bool,
    pub functions: Vec<FunctionMetadata>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enums: Vec<EnumMetadata>,
}

impl MetadataDocument {
    /// @acp:summary "Serialize with two-space indentation"
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// @acp:summary "Write the document to a JSON file"
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// @acp:summary "One custom function entry"
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionMetadata {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_url: Option<String>,
    pub parameters: Vec<ParameterMetadata>,
    pub result: ResultMetadata,
    pub options: FunctionOptions,
}

impl From<&FunctionDescriptor> for FunctionMetadata {
    fn from(f: &FunctionDescriptor) -> Self {
        Self {
            id: f.id.clone(),
            name: f.name.clone(),
            description: non_empty(&f.description),
            help_url: f.help_url.as_deref().and_then(non_empty),
            parameters: f.visible_parameters().map(ParameterMetadata::from).collect(),
            result: ResultMetadata::from(&f.result),
            options: f.options.clone(),
        }
    }
}

/// @acp:summary "One user-facing parameter"
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterMetadata {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_value_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_enum_id: Option<String>,
    pub dimensionality: Dimensionality,
    pub optional: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub repeating: bool,
}

impl From<&ParameterDescriptor> for ParameterMetadata {
    fn from(p: &ParameterDescriptor) -> Self {
        Self {
            name: p.name.clone(),
            description: non_empty(&p.description),
            kind: p.ty.type_name().to_string(),
            cell_value_type: p.ty.cell_value_type().map(str::to_string),
            custom_enum_id: p.ty.custom_enum_id().map(str::to_string),
            dimensionality: p.ty.dimensionality(),
            optional: p.optional,
            repeating: p.repeating,
        }
    }
}

/// Result block; `dimensionality` is only written for matrices
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensionality: Option<Dimensionality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_enum_id: Option<String>,
}

impl From<&TypeDescriptor> for ResultMetadata {
    fn from(ty: &TypeDescriptor) -> Self {
        Self {
            kind: ty.type_name().to_string(),
            dimensionality: match ty.dimensionality() {
                Dimensionality::Scalar => None,
                matrix => Some(matrix),
            },
            custom_enum_id: ty.custom_enum_id().map(str::to_string),
        }
    }
}

/// @acp:summary "One custom enum entry"
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumMetadata {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EnumBaseType,
    pub values: Vec<EnumValueMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumValueMetadata {
    pub name: String,
    pub value: EnumValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

impl From<&EnumDescriptor> for EnumMetadata {
    fn from(e: &EnumDescriptor) -> Self {
        Self {
            id: e.name.clone(),
            kind: e.underlying,
            values: e
                .members
                .iter()
                .map(|m| EnumValueMetadata {
                    name: m.name.clone(),
                    value: m.value.clone(),
                    tooltip: non_empty(&m.description),
                })
                .collect(),
        }
    }
}
