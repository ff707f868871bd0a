//! @acp:module "Signature Extractor"
//! @acp:summary "Merges code signatures with doc tags into candidate function descriptors"
//! @acp:domain cli
//! @acp:layer service
//!
//! Precedence for every parameter and the result: a `{type}` block in the
//! matching tag, then the code annotation, then the default (`Any` for
//! parameters, return-statement inference for results).

use std::collections::HashMap;

use serde::Serialize;

use crate::diagnostic::{Diagnostic, Subject};
use crate::parse::{parse_tags, ParamTag, ReturnsTag, SystemTag, TagSet};
use crate::source::{FunctionDecl, ParamDecl};
use crate::types::{infer_result, InvocationKind, Position, TypeDescriptor, TypeExpr, TypeResolver};

fn is_false(value: &bool) -> bool {
    !*value
}

/// @acp:summary "Presence flags for the function options block"
/// `volatile`, `stream` and `cancelable` are always emitted; the rest only when set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionOptions {
    pub volatile: bool,
    pub stream: bool,
    pub cancelable: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub requires_address: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub requires_parameter_addresses: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub requires_stream_address: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub requires_stream_parameter_addresses: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub support_sync: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub captures_calling_object: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub exclude_from_auto_complete: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub linked_entity_load_service: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub linked_entity_data_provider: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub action: bool,
}

impl FunctionOptions {
    /// Flags whose tag is present
    pub fn from_tags(tags: &TagSet) -> Self {
        Self {
            volatile: tags.has(SystemTag::Volatile),
            stream: tags.has(SystemTag::Streaming),
            cancelable: tags.has(SystemTag::Cancelable),
            requires_address: tags.has(SystemTag::RequiresAddress),
            requires_parameter_addresses: tags.has(SystemTag::RequiresParameterAddresses),
            requires_stream_address: tags.has(SystemTag::RequiresStreamAddress),
            requires_stream_parameter_addresses: tags
                .has(SystemTag::RequiresStreamParameterAddresses),
            support_sync: tags.has(SystemTag::SupportSync),
            captures_calling_object: tags.has(SystemTag::CapturesCallingObject),
            exclude_from_auto_complete: tags.has(SystemTag::ExcludeFromAutoComplete),
            linked_entity_load_service: tags.has(SystemTag::LinkedEntityLoadService),
            linked_entity_data_provider: tags.has(SystemTag::LinkedEntityDataProvider),
            action: tags.has(SystemTag::Action),
        }
    }

    /// Whether the option driven by `tag` is set
    pub fn is_set(&self, tag: SystemTag) -> bool {
        match tag {
            SystemTag::Volatile => self.volatile,
            SystemTag::Streaming => self.stream,
            SystemTag::Cancelable => self.cancelable,
            SystemTag::RequiresAddress => self.requires_address,
            SystemTag::RequiresParameterAddresses => self.requires_parameter_addresses,
            SystemTag::RequiresStreamAddress => self.requires_stream_address,
            SystemTag::RequiresStreamParameterAddresses => self.requires_stream_parameter_addresses,
            SystemTag::SupportSync => self.support_sync,
            SystemTag::CapturesCallingObject => self.captures_calling_object,
            SystemTag::ExcludeFromAutoComplete => self.exclude_from_auto_complete,
            SystemTag::LinkedEntityLoadService => self.linked_entity_load_service,
            SystemTag::LinkedEntityDataProvider => self.linked_entity_data_provider,
            SystemTag::Action => self.action,
            SystemTag::CustomFunction
            | SystemTag::Param
            | SystemTag::Returns
            | SystemTag::HelpUrl
            | SystemTag::CustomEnum => false,
        }
    }
}

/// @acp:summary "One declared parameter after type resolution"
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub ty: TypeDescriptor,
    pub description: String,
    pub optional: bool,
    pub repeating: bool,
    /// Set for host-supplied invocation parameters
    pub invocation: Option<InvocationKind>,
    pub line: usize,
}

/// @acp:summary "Candidate custom function prior to validation"
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDescriptor {
    pub id: String,
    pub name: String,
    /// Identifier of the implementing function in source
    pub code_name: String,
    pub description: String,
    pub help_url: Option<String>,
    /// Every declared parameter, invocation parameters included
    pub parameters: Vec<ParameterDescriptor>,
    pub result: TypeDescriptor,
    pub options: FunctionOptions,
    /// Return type annotation as written in code
    pub declared_return: Option<TypeExpr>,
    pub line: usize,
}

impl FunctionDescriptor {
    /// Parameters exposed to spreadsheet users
    pub fn visible_parameters(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.parameters.iter().filter(|p| p.invocation.is_none())
    }

    /// Position and kind of the first invocation parameter
    pub fn invocation(&self) -> Option<(usize, InvocationKind)> {
        self.parameters
            .iter()
            .enumerate()
            .find_map(|(idx, p)| p.invocation.map(|kind| (idx, kind)))
    }
}

/// A descriptor plus the diagnostics raised while building it
#[derive(Debug, Clone)]
pub struct Candidate {
    pub function: FunctionDescriptor,
    pub diagnostics: Vec<Diagnostic>,
}

/// @acp:summary "Builds candidates from declarations using one unit's resolver"
pub struct SignatureExtractor<'a> {
    resolver: TypeResolver<'a>,
}

impl<'a> SignatureExtractor<'a> {
    pub fn new(resolver: TypeResolver<'a>) -> Self {
        Self { resolver }
    }

    /// @acp:summary "Build a candidate, or None when the function is not a custom function"
    pub fn extract(&self, decl: &FunctionDecl) -> Option<Candidate> {
        let doc = decl.doc.as_ref()?;
        let tags = parse_tags(doc);
        let marker = tags.first(SystemTag::CustomFunction)?;

        let mut diagnostics = Vec::new();

        let tokens: Vec<&str> = marker.raw_value.split_whitespace().collect();
        if tokens.len() > 2 {
            diagnostics.push(
                Diagnostic::error(
                    Subject::Function,
                    &decl.name,
                    format!(
                        "@customfunction accepts at most an id and a name, found {} values",
                        tokens.len()
                    ),
                )
                .at_line(marker.line),
            );
        }
        let id = tokens
            .first()
            .map(|t| t.to_string())
            .unwrap_or_else(|| decl.name.to_uppercase());
        let name = tokens.get(1).map(|t| t.to_string()).unwrap_or_else(|| id.clone());

        let param_tags = self.param_tags(decl, &tags, &mut diagnostics);

        let parameters: Vec<ParameterDescriptor> = decl
            .params
            .iter()
            .map(|param| self.parameter(param, param_tags.get(param.name.as_str())))
            .collect();

        let mut options = FunctionOptions::from_tags(&tags);
        for param in &parameters {
            match param.invocation {
                Some(InvocationKind::Streaming) => {
                    options.stream = true;
                    options.cancelable = true;
                }
                Some(InvocationKind::Cancelable) => options.cancelable = true,
                _ => {}
            }
        }

        let result = self.result(decl, &tags, &parameters);

        let function = FunctionDescriptor {
            id,
            name,
            code_name: decl.name.clone(),
            description: tags.description.clone(),
            help_url: tags.first(SystemTag::HelpUrl).map(|t| join_lines(&t.raw_value)),
            parameters,
            result,
            options,
            declared_return: decl.return_type.clone(),
            line: decl.line,
        };

        Some(Candidate {
            function,
            diagnostics,
        })
    }

    /// `@param` tags keyed by name; the first tag for a name wins
    fn param_tags(
        &self,
        decl: &FunctionDecl,
        tags: &TagSet,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> HashMap<String, ParamTag> {
        let mut by_name: HashMap<String, ParamTag> = HashMap::new();
        for tag in tags.all(SystemTag::Param) {
            let Some(parsed) = ParamTag::parse(&tag.raw_value) else {
                diagnostics.push(
                    Diagnostic::warning(Subject::Function, &decl.name, "@param tag has no parameter name")
                        .at_line(tag.line),
                );
                continue;
            };
            if !decl.params.iter().any(|p| p.name == parsed.name) {
                diagnostics.push(
                    Diagnostic::warning(
                        Subject::Function,
                        &decl.name,
                        format!("@param \"{}\" does not match any parameter", parsed.name),
                    )
                    .at_line(tag.line),
                );
                continue;
            }
            by_name.entry(parsed.name.clone()).or_insert(parsed);
        }
        by_name
    }

    fn parameter(&self, param: &ParamDecl, tag: Option<&ParamTag>) -> ParameterDescriptor {
        let tag_type = tag
            .and_then(|t| t.type_text.as_deref())
            .map(TypeExpr::parse);
        let from_tag = tag_type.is_some();
        let expr = tag_type.or_else(|| param.type_expr.clone());

        let mut optional = param.optional || param.has_default || tag.is_some_and(|t| t.optional);
        let mut repeating = param.rest;

        let ty = match expr {
            None => TypeDescriptor::Any,
            Some(expr) => {
                let mut target = &expr;
                if let TypeExpr::Optional(inner) = target {
                    optional = true;
                    target = inner.as_ref();
                }
                if let TypeExpr::Rest(inner) = target {
                    repeating = true;
                    target = inner.as_ref();
                } else if param.rest {
                    // `...values: T[]` repeats T; a JSDoc rest type is written as `...T` instead
                    if let Some(element) = target.array_element() {
                        target = element;
                    } else if from_tag {
                        tracing::debug!("Rest parameter {} has non-array tag type {}", param.name, target);
                    }
                }
                self.resolver.resolve(target, Position::Parameter)
            }
        };

        ParameterDescriptor {
            name: param.name.clone(),
            invocation: ty.invocation_kind(),
            ty,
            description: tag.map(|t| t.description.clone()).unwrap_or_default(),
            optional,
            repeating,
            line: param.line,
        }
    }

    fn result(
        &self,
        decl: &FunctionDecl,
        tags: &TagSet,
        parameters: &[ParameterDescriptor],
    ) -> TypeDescriptor {
        // Streaming functions deliver values through the invocation parameter
        if let Some(param) = parameters
            .iter()
            .find(|p| p.invocation == Some(InvocationKind::Streaming))
        {
            return match &param.ty {
                TypeDescriptor::Invocation {
                    result: Some(result),
                    ..
                } => (**result).clone(),
                _ => TypeDescriptor::Any,
            };
        }

        let tag_type = tags
            .first(SystemTag::Returns)
            .map(|t| ReturnsTag::parse(&t.raw_value))
            .and_then(|r| r.type_text);

        if let Some(text) = tag_type {
            return self.resolver.resolve(&TypeExpr::parse(&text), Position::Result);
        }
        if let Some(expr) = &decl.return_type {
            return self.resolver.resolve(expr, Position::Result);
        }
        infer_result(&decl.return_hints)
    }
}

/// Multi-line tag values are joined with each line trimmed
fn join_lines(value: &str) -> String {
    value.lines().map(str::trim).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::EnumRegistry;
    use crate::source::{DocComment, ReturnHint};
    use crate::types::Dimensionality;

    fn decl(doc: &str, params: Vec<ParamDecl>) -> FunctionDecl {
        let mut decl = FunctionDecl::new("add");
        decl.doc = Some(DocComment::from_block(doc, 1));
        decl.params = params;
        decl
    }

    fn extract(decl: &FunctionDecl) -> Option<Candidate> {
        let registry = EnumRegistry::new();
        SignatureExtractor::new(TypeResolver::new(&registry)).extract(decl)
    }

    #[test]
    fn test_requires_customfunction_tag() {
        let d = decl("/** Adds numbers. */", vec![]);
        assert!(extract(&d).is_none());
        assert!(extract(&FunctionDecl::new("bare")).is_none());
    }

    #[test]
    fn test_id_and_name() {
        let c = extract(&decl("/** @customfunction */", vec![])).unwrap();
        assert_eq!(c.function.id, "ADD");
        assert_eq!(c.function.name, "ADD");

        let c = extract(&decl("/** @customfunction newId newName */", vec![])).unwrap();
        assert_eq!(c.function.id, "newId");
        assert_eq!(c.function.name, "newName");

        let c = extract(&decl("/** @customfunction onlyId */", vec![])).unwrap();
        assert_eq!(c.function.name, "onlyId");

        let c = extract(&decl("/** @customfunction a b c */", vec![])).unwrap();
        assert_eq!(c.diagnostics.len(), 1);
        assert!(c.diagnostics[0].is_error());
    }

    #[test]
    fn test_tag_type_overrides_code_type() {
        let d = decl(
            "/**\n * @customfunction\n * @param {string} first The first\n */",
            vec![ParamDecl::new("first").with_type("number")],
        );
        let c = extract(&d).unwrap();
        let p = &c.function.parameters[0];
        assert_eq!(p.ty, TypeDescriptor::String);
        assert_eq!(p.description, "The first");
        assert!(!p.optional);
    }

    #[test]
    fn test_untyped_parameter_defaults_to_any() {
        let c = extract(&decl("/** @customfunction */", vec![ParamDecl::new("x")])).unwrap();
        assert_eq!(c.function.parameters[0].ty, TypeDescriptor::Any);
    }

    #[test]
    fn test_optional_and_repeating() {
        let mut rest = ParamDecl::new("values").with_type("number[]");
        rest.rest = true;
        let d = decl(
            "/**\n * @customfunction\n * @param {string} [label] Label\n * @param {number=} scale\n */",
            vec![ParamDecl::new("label"), ParamDecl::new("scale"), rest],
        );
        let c = extract(&d).unwrap();
        let params = &c.function.parameters;
        assert!(params[0].optional);
        assert!(params[1].optional);
        assert_eq!(params[1].ty, TypeDescriptor::Number);
        assert!(params[2].repeating);
        assert_eq!(params[2].ty, TypeDescriptor::Number);
    }

    #[test]
    fn test_jsdoc_rest_type() {
        let d = decl(
            "/**\n * @customfunction\n * @param {...number[]} rows\n */",
            vec![ParamDecl::new("rows")],
        );
        let c = extract(&d).unwrap();
        let p = &c.function.parameters[0];
        assert!(p.repeating);
        assert_eq!(p.ty.dimensionality(), Dimensionality::Matrix);
    }

    #[test]
    fn test_unknown_param_tag_warns() {
        let d = decl(
            "/**\n * @customfunction\n * @param {number} missing Nope\n */",
            vec![ParamDecl::new("x")],
        );
        let c = extract(&d).unwrap();
        assert_eq!(c.diagnostics.len(), 1);
        assert!(!c.diagnostics[0].is_error());
    }

    #[test]
    fn test_streaming_invocation_sets_result_and_options() {
        let d = decl(
            "/** @customfunction */",
            vec![ParamDecl::new("invocation").with_type("CustomFunctions.StreamingInvocation<number>")],
        );
        let c = extract(&d).unwrap();
        assert_eq!(c.function.result, TypeDescriptor::Number);
        assert!(c.function.options.stream);
        assert!(c.function.options.cancelable);
        assert_eq!(c.function.visible_parameters().count(), 0);
        assert_eq!(c.function.invocation(), Some((0, InvocationKind::Streaming)));
    }

    #[test]
    fn test_result_precedence() {
        let mut d = decl("/**\n * @customfunction\n * @returns {string} Text\n */", vec![]);
        d.return_type = Some(TypeExpr::parse("number"));
        assert_eq!(extract(&d).unwrap().function.result, TypeDescriptor::String);

        let mut d = decl("/** @customfunction */", vec![]);
        d.return_type = Some(TypeExpr::parse("Promise<number>"));
        assert_eq!(extract(&d).unwrap().function.result, TypeDescriptor::Number);

        let mut d = decl("/** @customfunction */", vec![]);
        d.return_hints = vec![ReturnHint::Boolean];
        assert_eq!(extract(&d).unwrap().function.result, TypeDescriptor::Boolean);
    }

    #[test]
    fn test_help_url_and_options() {
        let d = decl(
            "/**\n * Adds.\n * @customfunction\n * @helpurl https://contoso.com/\n *   help\n * @helpurl second\n * @volatile\n */",
            vec![],
        );
        let c = extract(&d).unwrap();
        assert_eq!(c.function.help_url.as_deref(), Some("https://contoso.com/help"));
        assert_eq!(c.function.description, "Adds.");
        assert!(c.function.options.volatile);
        assert!(!c.function.options.stream);
    }
}
