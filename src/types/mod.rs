//! @acp:module "Types"
//! @acp:summary "Resolved metadata types and the resolver that produces them"
//! @acp:domain cli
//! @acp:layer model
//!
//! - [`expr`]: parser shared by code annotations and `{type}` tag blocks
//! - [`resolve`]: maps a [`TypeExpr`] onto a [`TypeDescriptor`]

pub mod expr;
pub mod resolve;

pub use expr::{LiteralKind, TypeExpr};
pub use resolve::{infer_result, Position, TypeResolver};

use serde::{Deserialize, Serialize};

/// @acp:summary "Underlying value type of a custom enum"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumBaseType {
    Number,
    String,
}

impl EnumBaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnumBaseType::Number => "number",
            EnumBaseType::String => "string",
        }
    }
}

/// @acp:summary "Host-supplied trailing parameter kinds"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvocationKind {
    Invocation,
    Cancelable,
    Streaming,
}

impl InvocationKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            InvocationKind::Invocation => "CustomFunctions.Invocation",
            InvocationKind::Cancelable => "CustomFunctions.CancelableInvocation",
            InvocationKind::Streaming => "CustomFunctions.StreamingInvocation",
        }
    }
}

/// @acp:summary "Host cell value object types"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellValueKind {
    CellValue,
    Array,
    Boolean,
    Double,
    Entity,
    Error,
    FormattedNumber,
    LinkedEntity,
    LocalImage,
    String,
    ValueTypeNotAvailable,
    WebImage,
}

impl CellValueKind {
    /// Match a type name with or without the `Excel.` namespace
    pub fn from_type_name(name: &str) -> Option<Self> {
        let bare = name.strip_prefix("Excel.").unwrap_or(name);
        let kind = match bare {
            "CellValue" => CellValueKind::CellValue,
            "ArrayCellValue" => CellValueKind::Array,
            "BooleanCellValue" => CellValueKind::Boolean,
            "DoubleCellValue" => CellValueKind::Double,
            "EntityCellValue" => CellValueKind::Entity,
            "ErrorCellValue" => CellValueKind::Error,
            "FormattedNumberCellValue" => CellValueKind::FormattedNumber,
            "LinkedEntityCellValue" => CellValueKind::LinkedEntity,
            "LocalImageCellValue" => CellValueKind::LocalImage,
            "StringCellValue" => CellValueKind::String,
            "ValueTypeNotAvailableCellValue" => CellValueKind::ValueTypeNotAvailable,
            "WebImageCellValue" => CellValueKind::WebImage,
            _ => return None,
        };
        Some(kind)
    }

    /// Value of the `cellValueType` metadata field
    pub fn as_str(&self) -> &'static str {
        match self {
            CellValueKind::CellValue => "cellvalue",
            CellValueKind::Array => "arraycellvalue",
            CellValueKind::Boolean => "booleancellvalue",
            CellValueKind::Double => "doublecellvalue",
            CellValueKind::Entity => "entitycellvalue",
            CellValueKind::Error => "errorcellvalue",
            CellValueKind::FormattedNumber => "formattednumbercellvalue",
            CellValueKind::LinkedEntity => "linkedentitycellvalue",
            CellValueKind::LocalImage => "localimagecellvalue",
            CellValueKind::String => "stringcellvalue",
            CellValueKind::ValueTypeNotAvailable => "valuetypenotavailablecellvalue",
            CellValueKind::WebImage => "webimagecellvalue",
        }
    }
}

/// Emitted `dimensionality` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimensionality {
    Scalar,
    Matrix,
}

/// @acp:summary "A fully resolved parameter or result type"
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    Boolean,
    Number,
    String,
    Any,
    Object,
    Enum { name: String, underlying: EnumBaseType },
    CellValue(CellValueKind),
    /// `dimensionality` is 1 or 2
    Array { element: Box<TypeDescriptor>, dimensionality: u8 },
    /// Host-supplied parameter; `result` is the streaming type argument
    Invocation { kind: InvocationKind, result: Option<Box<TypeDescriptor>> },
    /// Rejected type with a human-readable reason
    Unsupported(String),
}

impl TypeDescriptor {
    pub fn unsupported(reason: impl Into<String>) -> Self {
        TypeDescriptor::Unsupported(reason.into())
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, TypeDescriptor::Unsupported(_))
    }

    /// Innermost reason when this or an array element is unsupported
    pub fn unsupported_reason(&self) -> Option<&str> {
        match self {
            TypeDescriptor::Unsupported(reason) => Some(reason),
            TypeDescriptor::Array { element, .. } => element.unsupported_reason(),
            TypeDescriptor::Invocation { result: Some(result), .. } => result.unsupported_reason(),
            _ => None,
        }
    }

    pub fn invocation_kind(&self) -> Option<InvocationKind> {
        match self {
            TypeDescriptor::Invocation { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Scalar types may appear as array elements; enums may not
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            TypeDescriptor::Array { .. }
                | TypeDescriptor::Enum { .. }
                | TypeDescriptor::Invocation { .. }
                | TypeDescriptor::Unsupported(_)
        )
    }

    /// Value of the emitted `type` field
    pub fn type_name(&self) -> &'static str {
        match self {
            TypeDescriptor::Boolean => "boolean",
            TypeDescriptor::Number => "number",
            TypeDescriptor::String => "string",
            TypeDescriptor::Enum { underlying, .. } => underlying.as_str(),
            TypeDescriptor::Array { element, .. } => element.type_name(),
            TypeDescriptor::Any
            | TypeDescriptor::Object
            | TypeDescriptor::CellValue(_)
            | TypeDescriptor::Invocation { .. }
            | TypeDescriptor::Unsupported(_) => "any",
        }
    }

    pub fn dimensionality(&self) -> Dimensionality {
        match self {
            TypeDescriptor::Array { .. } => Dimensionality::Matrix,
            _ => Dimensionality::Scalar,
        }
    }

    pub fn cell_value_type(&self) -> Option<&'static str> {
        match self {
            TypeDescriptor::CellValue(kind) => Some(kind.as_str()),
            TypeDescriptor::Array { element, .. } => element.cell_value_type(),
            _ => None,
        }
    }

    pub fn custom_enum_id(&self) -> Option<&str> {
        match self {
            TypeDescriptor::Enum { name, .. } => Some(name),
            TypeDescriptor::Array { element, .. } => element.custom_enum_id(),
            _ => None,
        }
    }
}

impl std::fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeDescriptor::Enum { name, .. } => write!(f, "{}", name),
            TypeDescriptor::CellValue(kind) => write!(f, "{}", kind.as_str()),
            TypeDescriptor::Array { element, dimensionality } => {
                write!(f, "{}{}", element, "[]".repeat(*dimensionality as usize))
            }
            TypeDescriptor::Invocation { kind, .. } => write!(f, "{}", kind.type_name()),
            TypeDescriptor::Object => write!(f, "object"),
            TypeDescriptor::Unsupported(reason) => write!(f, "unsupported ({})", reason),
            other => write!(f, "{}", other.type_name()),
        }
    }
}
