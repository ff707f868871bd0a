//! @acp:module "Type Resolver"
//! @acp:summary "Maps parsed type expressions onto supported metadata types"
//! @acp:domain cli
//! @acp:layer service
//!
//! The resolver never guesses silently: anything it cannot map becomes
//! [`TypeDescriptor::Unsupported`] with a reason, and genuine ambiguity
//! (heterogeneous unions, untyped values) becomes `Any`.

use crate::enums::{EnumRegistry, RegisteredEnum};
use crate::source::ReturnHint;

use super::{CellValueKind, InvocationKind, LiteralKind, TypeDescriptor, TypeExpr};

/// Highest array nesting the host understands
const MAX_DIMENSIONS: usize = 2;

/// Where a type appears; cell values and promises behave differently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Parameter,
    Result,
}

/// @acp:summary "Resolves type expressions against one unit's enums"
#[derive(Debug, Clone, Copy)]
pub struct TypeResolver<'a> {
    enums: &'a EnumRegistry,
}

impl<'a> TypeResolver<'a> {
    pub fn new(enums: &'a EnumRegistry) -> Self {
        Self { enums }
    }

    /// @acp:summary "Resolve a type expression at a given position"
    pub fn resolve(&self, expr: &TypeExpr, position: Position) -> TypeDescriptor {
        match expr {
            TypeExpr::Named(name) => self.resolve_named(name, position),
            TypeExpr::Generic { name, args } => self.resolve_generic(name, args, expr, position),
            TypeExpr::Array(_) => self.resolve_array(expr, position),
            TypeExpr::Union(members) => self.resolve_union(members, position),
            TypeExpr::Tuple(_) => TypeDescriptor::unsupported(format!(
                "tuple type \"{}\" is not supported",
                expr
            )),
            TypeExpr::Literal(kind) => literal_type(*kind),
            TypeExpr::Object => TypeDescriptor::Object,
            TypeExpr::Function => TypeDescriptor::unsupported("function types are not supported"),
            TypeExpr::Rest(inner) | TypeExpr::Optional(inner) => self.resolve(inner, position),
            TypeExpr::Invalid(text) if text.is_empty() => {
                TypeDescriptor::unsupported("empty type annotation")
            }
            TypeExpr::Invalid(text) => {
                TypeDescriptor::unsupported(format!("type \"{}\" is not supported", text))
            }
        }
    }

    fn resolve_named(&self, name: &str, position: Position) -> TypeDescriptor {
        match name {
            "number" | "Number" => return TypeDescriptor::Number,
            "string" | "String" => return TypeDescriptor::String,
            "boolean" | "Boolean" => return TypeDescriptor::Boolean,
            "any" | "unknown" => return TypeDescriptor::Any,
            "object" | "Object" => return TypeDescriptor::Object,
            "Array" => {
                return TypeDescriptor::Array {
                    element: Box::new(TypeDescriptor::Any),
                    dimensionality: 1,
                }
            }
            "void" | "undefined" | "null" | "never" => {
                return TypeDescriptor::unsupported(format!("type \"{}\" is not supported", name))
            }
            _ => {}
        }

        if let Some(kind) = invocation_kind(name) {
            return TypeDescriptor::Invocation { kind, result: None };
        }

        if let Some(kind) = CellValueKind::from_type_name(name) {
            return match position {
                Position::Parameter => TypeDescriptor::CellValue(kind),
                // Structural detail of cell values is omitted for results
                Position::Result => TypeDescriptor::Any,
            };
        }

        match self.enums.by_name(name) {
            Some(RegisteredEnum::Valid(desc)) => TypeDescriptor::Enum {
                name: desc.name.clone(),
                underlying: desc.underlying,
            },
            Some(RegisteredEnum::Invalid { .. }) => TypeDescriptor::unsupported(format!(
                "custom enum \"{}\" is invalid",
                name
            )),
            None => TypeDescriptor::unsupported(format!("type \"{}\" is not supported", name)),
        }
    }

    fn resolve_generic(
        &self,
        name: &str,
        args: &[TypeExpr],
        expr: &TypeExpr,
        position: Position,
    ) -> TypeDescriptor {
        if expr.array_element().is_some() {
            return self.resolve_array(expr, position);
        }

        match (name, args) {
            ("Promise", [inner]) => match position {
                Position::Result => self.resolve(inner, position),
                Position::Parameter => TypeDescriptor::unsupported("promise parameters are not supported"),
            },
            (_, [inner]) if invocation_kind(name) == Some(InvocationKind::Streaming) => {
                TypeDescriptor::Invocation {
                    kind: InvocationKind::Streaming,
                    result: Some(Box::new(self.resolve(inner, Position::Result))),
                }
            }
            _ => TypeDescriptor::unsupported(format!("type \"{}\" is not supported", expr)),
        }
    }

    fn resolve_array(&self, expr: &TypeExpr, position: Position) -> TypeDescriptor {
        let depth = expr.array_depth();
        if depth > MAX_DIMENSIONS {
            return TypeDescriptor::unsupported(format!(
                "\"{}\" has {} dimensions; at most {} are supported",
                expr, depth, MAX_DIMENSIONS
            ));
        }

        let mut element = expr;
        while let Some(inner) = element.array_element() {
            element = inner;
        }

        let resolved = self.resolve(element, position);
        if resolved.is_unsupported() {
            return resolved;
        }
        if !resolved.is_scalar() {
            return TypeDescriptor::unsupported(format!(
                "\"{}\" is not a valid array element type",
                element
            ));
        }

        TypeDescriptor::Array {
            element: Box::new(resolved),
            dimensionality: depth as u8,
        }
    }

    fn resolve_union(&self, members: &[TypeExpr], position: Position) -> TypeDescriptor {
        let relevant: Vec<&TypeExpr> = members
            .iter()
            .filter(|m| !matches!(m.as_named(), Some("null") | Some("undefined")))
            .collect();

        if relevant.is_empty() {
            return TypeDescriptor::unsupported("union contains only null or undefined");
        }

        let resolved: Vec<TypeDescriptor> = relevant
            .iter()
            .map(|member| self.resolve(member, position))
            .collect();

        if let Some(bad) = resolved.iter().find(|t| t.invocation_kind().is_some()) {
            return TypeDescriptor::unsupported(format!("{} cannot be part of a union", bad));
        }

        if let Some(bad) = resolved.iter().find(|t| t.is_unsupported()) {
            return bad.clone();
        }

        let first = &resolved[0];
        if resolved.iter().all(|t| t == first) {
            first.clone()
        } else {
            TypeDescriptor::Any
        }
    }
}

fn literal_type(kind: LiteralKind) -> TypeDescriptor {
    match kind {
        LiteralKind::Boolean => TypeDescriptor::Boolean,
        LiteralKind::Number => TypeDescriptor::Number,
        LiteralKind::String => TypeDescriptor::String,
    }
}

fn invocation_kind(name: &str) -> Option<InvocationKind> {
    let bare = name.strip_prefix("CustomFunctions.").unwrap_or(name);
    match bare {
        "Invocation" => Some(InvocationKind::Invocation),
        "CancelableInvocation" => Some(InvocationKind::Cancelable),
        "StreamingInvocation" => Some(InvocationKind::Streaming),
        _ => None,
    }
}

/// @acp:summary "Infer a result type from literal return statements"
/// Only literal booleans, numbers, strings and arrays are classified; any
/// other mix resolves to `Any`.
pub fn infer_result(hints: &[ReturnHint]) -> TypeDescriptor {
    let values: Vec<ReturnHint> = hints
        .iter()
        .copied()
        .filter(|h| *h != ReturnHint::Empty)
        .collect();

    let Some(first) = values.first().copied() else {
        return TypeDescriptor::Any;
    };
    if values.iter().any(|h| *h != first) {
        return TypeDescriptor::Any;
    }

    match first {
        ReturnHint::Boolean => TypeDescriptor::Boolean,
        ReturnHint::Number => TypeDescriptor::Number,
        ReturnHint::String => TypeDescriptor::String,
        ReturnHint::Array { nested } => TypeDescriptor::Array {
            element: Box::new(TypeDescriptor::Any),
            dimensionality: if nested { 2 } else { 1 },
        },
        ReturnHint::Object | ReturnHint::Empty | ReturnHint::Unknown => TypeDescriptor::Any,
    }
}
