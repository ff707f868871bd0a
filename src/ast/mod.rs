//! @acp:module "AST Parser"
//! @acp:summary "tree-sitter front end lowering TypeScript/JavaScript into the source model"
//! @acp:domain cli
//! @acp:layer parser
//!
//! Only top-level declarations are lowered: function declarations (plain or
//! exported) and enum declarations. The doc comment of a declaration is the
//! `/** ... */` comment that immediately precedes it (or the `export`
//! keyword wrapping it).

use std::path::Path;

use tree_sitter::{Node, Parser};

use crate::error::{Error, Result};
use crate::source::{
    DocComment, EnumDecl, EnumMemberDecl, FunctionDecl, Language, Literal, ParamDecl, ReturnHint,
    SourceUnit,
};
use crate::types::TypeExpr;

/// Node kinds whose `return` statements belong to another function
const NESTED_SCOPES: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "function",
    "generator_function",
    "arrow_function",
    "method_definition",
    "class_declaration",
    "class",
];

/// @acp:summary "Parses source text into a SourceUnit"
#[derive(Debug, Default, Clone, Copy)]
pub struct AstParser;

impl AstParser {
    pub fn new() -> Self {
        Self
    }

    /// @acp:summary "Parse a file's text, detecting the dialect from its extension"
    pub fn parse_file(&self, path: &Path, source: &str) -> Result<SourceUnit> {
        let language = Language::from_path(path)?;
        self.parse_source(path, source, language)
    }

    /// @acp:summary "Parse source text of a known dialect"
    /// Fails when the text contains syntax errors; no partial unit is produced.
    pub fn parse_source(&self, path: &Path, source: &str, language: Language) -> Result<SourceUnit> {
        let mut parser = Parser::new();
        let grammar: tree_sitter::Language = match language {
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        };
        parser.set_language(&grammar)?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| Error::Other(format!("Parser produced no tree for {}", path.display())))?;
        let root = tree.root_node();

        if root.has_error() {
            let line = first_error_line(root).unwrap_or(1);
            return Err(Error::Parse {
                path: path.to_path_buf(),
                line,
            });
        }

        let mut unit = SourceUnit::new(path, language);
        let mut cursor = root.walk();
        for node in root.named_children(&mut cursor) {
            self.lower_top_level(node, node, source, &mut unit);
        }

        tracing::debug!(
            "Parsed {}: {} functions, {} enums",
            path.display(),
            unit.functions.len(),
            unit.enums.len()
        );
        Ok(unit)
    }

    /// `anchor` is the node whose preceding comment documents `node`
    fn lower_top_level(&self, node: Node<'_>, anchor: Node<'_>, src: &str, unit: &mut SourceUnit) {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => {
                if let Some(func) = lower_function(node, doc_before(anchor, src), src) {
                    unit.functions.push(func);
                }
            }
            "enum_declaration" => {
                if let Some(decl) = lower_enum(node, doc_before(anchor, src), src) {
                    unit.enums.push(decl);
                }
            }
            "export_statement" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    if matches!(
                        child.kind(),
                        "function_declaration" | "generator_function_declaration" | "enum_declaration"
                    ) {
                        self.lower_top_level(child, anchor, src, unit);
                    }
                }
            }
            _ => {}
        }
    }
}

fn text<'s>(node: Node<'_>, src: &'s str) -> &'s str {
    node.utf8_text(src.as_bytes()).unwrap_or("")
}

fn line_of(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

fn first_error_line(node: Node<'_>) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(line_of(node));
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() {
            if let Some(line) = first_error_line(child) {
                return Some(line);
            }
        }
    }
    None
}

fn is_doc_comment(node: Node<'_>, src: &str) -> bool {
    node.kind() == "comment" && text(node, src).starts_with("/**")
}

fn doc_before(node: Node<'_>, src: &str) -> Option<DocComment> {
    let prev = node.prev_sibling()?;
    if is_doc_comment(prev, src) {
        Some(DocComment::from_block(text(prev, src), line_of(prev)))
    } else {
        None
    }
}

/// Text of a `type_annotation` node without its leading colon
fn annotation_type(node: Node<'_>, src: &str) -> TypeExpr {
    let raw = text(node, src).trim();
    TypeExpr::parse(raw.strip_prefix(':').unwrap_or(raw))
}

fn lower_function(node: Node<'_>, doc: Option<DocComment>, src: &str) -> Option<FunctionDecl> {
    let name = text(node.child_by_field_name("name")?, src).to_string();
    let mut func = FunctionDecl::new(name);
    func.doc = doc;
    func.line = line_of(node);

    let mut cursor = node.walk();
    func.is_async = node.children(&mut cursor).any(|c| c.kind() == "async");

    if let Some(params) = node.child_by_field_name("parameters") {
        let mut cursor = params.walk();
        for param in params.named_children(&mut cursor) {
            if let Some(decl) = lower_param(param, src) {
                func.params.push(decl);
            }
        }
    }

    func.return_type = node
        .child_by_field_name("return_type")
        .map(|rt| annotation_type(rt, src));

    if let Some(body) = node.child_by_field_name("body") {
        collect_returns(body, src, &mut func.return_hints);
    }

    Some(func)
}

fn lower_param(node: Node<'_>, src: &str) -> Option<ParamDecl> {
    match node.kind() {
        // TypeScript parameter wrappers
        "required_parameter" | "optional_parameter" => {
            let pattern = node.child_by_field_name("pattern")?;
            let mut decl = lower_pattern(pattern, src)?;
            decl.optional = node.kind() == "optional_parameter";
            decl.has_default = node.child_by_field_name("value").is_some();
            decl.type_expr = node
                .child_by_field_name("type")
                .map(|t| annotation_type(t, src));
            decl.line = line_of(node);
            Some(decl)
        }
        // JavaScript default value: `x = 1`
        "assignment_pattern" => {
            let left = node.child_by_field_name("left")?;
            let mut decl = lower_pattern(left, src)?;
            decl.has_default = true;
            decl.line = line_of(node);
            Some(decl)
        }
        "comment" => None,
        _ => {
            let mut decl = lower_pattern(node, src)?;
            decl.line = line_of(node);
            Some(decl)
        }
    }
}

fn lower_pattern(node: Node<'_>, src: &str) -> Option<ParamDecl> {
    match node.kind() {
        "this" => None,
        "identifier" => Some(ParamDecl::new(text(node, src))),
        "rest_pattern" => {
            let mut cursor = node.walk();
            let inner = node.named_children(&mut cursor).find(|c| c.kind() != "comment")?;
            let mut decl = lower_pattern(inner, src)?;
            decl.rest = true;
            Some(decl)
        }
        // Destructured parameters keep their source text as a name
        _ => Some(ParamDecl::new(text(node, src))),
    }
}

fn collect_returns(node: Node<'_>, src: &str, hints: &mut Vec<ReturnHint>) {
    if node.kind() == "return_statement" {
        let mut cursor = node.walk();
        let value = node.named_children(&mut cursor).find(|c| c.kind() != "comment");
        hints.push(match value {
            Some(expr) => classify_return(expr, src),
            None => ReturnHint::Empty,
        });
        return;
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if !NESTED_SCOPES.contains(&child.kind()) {
            collect_returns(child, src, hints);
        }
    }
}

fn classify_return(node: Node<'_>, src: &str) -> ReturnHint {
    match node.kind() {
        "true" | "false" => ReturnHint::Boolean,
        "number" => ReturnHint::Number,
        "string" | "template_string" => ReturnHint::String,
        "object" => ReturnHint::Object,
        "array" => {
            let mut cursor = node.walk();
            let elements: Vec<Node<'_>> = node
                .named_children(&mut cursor)
                .filter(|c| c.kind() != "comment")
                .collect();
            let nested = !elements.is_empty() && elements.iter().all(|e| e.kind() == "array");
            ReturnHint::Array { nested }
        }
        "parenthesized_expression" => {
            let mut cursor = node.walk();
            let inner = node.named_children(&mut cursor).find(|c| c.kind() != "comment");
            inner.map(|e| classify_return(e, src)).unwrap_or(ReturnHint::Unknown)
        }
        "unary_expression" => {
            let operator = node.child_by_field_name("operator").map(|op| text(op, src));
            let argument = node.child_by_field_name("argument").map(|a| a.kind());
            match (operator, argument) {
                (Some("!"), _) => ReturnHint::Boolean,
                (Some("-") | Some("+"), Some("number")) => ReturnHint::Number,
                _ => ReturnHint::Unknown,
            }
        }
        _ => ReturnHint::Unknown,
    }
}

fn lower_enum(node: Node<'_>, doc: Option<DocComment>, src: &str) -> Option<EnumDecl> {
    let name = text(node.child_by_field_name("name")?, src).to_string();
    let body = node.child_by_field_name("body")?;

    let mut members = Vec::new();
    let mut pending_doc: Option<DocComment> = None;
    let mut next_auto: Option<f64> = Some(0.0);

    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        let (name_text, value) = match child.kind() {
            "comment" => {
                if is_doc_comment(child, src) {
                    pending_doc = Some(DocComment::from_block(text(child, src), line_of(child)));
                }
                continue;
            }
            "property_identifier" | "string" => (member_name(child, src), None),
            "enum_assignment" => {
                let Some(name_node) = child.child_by_field_name("name") else { continue };
                let value = child
                    .child_by_field_name("value")
                    .and_then(|v| literal_value(v, src));
                // A non-literal initializer stops auto-numbering
                if child.child_by_field_name("value").is_some() && value.is_none() {
                    next_auto = None;
                }
                (member_name(name_node, src), value)
            }
            _ => continue,
        };

        let value = match value {
            Some(literal) => {
                next_auto = match &literal {
                    Literal::Number(n) => Some(n + 1.0),
                    _ => None,
                };
                Some(literal)
            }
            None if child.kind() == "enum_assignment" => None,
            None => {
                let auto = next_auto.map(Literal::Number);
                next_auto = next_auto.map(|n| n + 1.0);
                auto
            }
        };

        members.push(EnumMemberDecl {
            name: name_text,
            value,
            doc: pending_doc.take(),
        });
    }

    Some(EnumDecl {
        name,
        doc,
        members,
        line: line_of(node),
    })
}

fn member_name(node: Node<'_>, src: &str) -> String {
    let raw = text(node, src);
    if node.kind() == "string" {
        unquote(raw)
    } else {
        raw.to_string()
    }
}

fn literal_value(node: Node<'_>, src: &str) -> Option<Literal> {
    match node.kind() {
        "number" => parse_number(text(node, src)).map(Literal::Number),
        "string" => Some(Literal::String(unquote(text(node, src)))),
        "template_string" => {
            let raw = text(node, src);
            if raw.contains("${") {
                None
            } else {
                Some(Literal::String(unquote(raw)))
            }
        }
        "true" => Some(Literal::Boolean(true)),
        "false" => Some(Literal::Boolean(false)),
        "unary_expression" => {
            let operator = text(node.child_by_field_name("operator")?, src);
            let argument = node.child_by_field_name("argument")?;
            match (operator, literal_value(argument, src)?) {
                ("-", Literal::Number(n)) => Some(Literal::Number(-n)),
                ("+", Literal::Number(n)) => Some(Literal::Number(n)),
                _ => None,
            }
        }
        "parenthesized_expression" => {
            let mut cursor = node.walk();
            let inner = node.named_children(&mut cursor).find(|c| c.kind() != "comment")?;
            literal_value(inner, src)
        }
        _ => None,
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = raw.replace('_', "");
    let lower = cleaned.to_lowercase();
    let radix = |prefix: &str, base: u32| {
        lower
            .strip_prefix(prefix)
            .and_then(|digits| u64::from_str_radix(digits, base).ok())
            .map(|n| n as f64)
    };
    radix("0x", 16)
        .or_else(|| radix("0o", 8))
        .or_else(|| radix("0b", 2))
        .or_else(|| lower.parse::<f64>().ok())
}

/// Strip surrounding quotes and resolve simple escapes
fn unquote(raw: &str) -> String {
    let inner = if raw.len() >= 2 {
        &raw[1..raw.len() - 1]
    } else {
        raw
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
