//! @acp:module "Source Model"
//! @acp:summary "Language-independent view of one parsed input file"
//! @acp:domain cli
//! @acp:layer model
//!
//! The front end in [`crate::ast`] lowers a tree-sitter tree into these types.
//! Everything downstream works on this model only, so the same pipeline runs
//! for both TypeScript and JavaScript input.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::TypeExpr;

/// @acp:summary "Source dialect of an input file"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    JavaScript,
}

impl Language {
    /// @acp:summary "Detect language from a file extension"
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "ts" | "mts" | "cts" => Ok(Language::TypeScript),
            "js" | "mjs" | "cjs" => Ok(Language::JavaScript),
            _ => Err(Error::UnsupportedLanguage(ext)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
        }
    }
}

/// @acp:summary "Raw documentation block preceding a declaration"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocComment {
    /// Comment body lines with `/**`, `*/` and leading `*` removed
    pub lines: Vec<String>,
    /// Line (1-indexed) where the comment starts
    pub line: usize,
}

impl DocComment {
    /// @acp:summary "Normalize a `/** ... */` block into body lines"
    pub fn from_block(text: &str, line: usize) -> Self {
        let body = text.trim();
        let body = body.strip_prefix("/**").or_else(|| body.strip_prefix("/*")).unwrap_or(body);
        let body = body.strip_suffix("*/").unwrap_or(body);

        let lines = body
            .lines()
            .map(|raw| {
                let trimmed = raw.trim_start();
                let stripped = match trimmed.strip_prefix('*') {
                    Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
                    None => trimmed,
                };
                stripped.trim_end().to_string()
            })
            .collect();

        Self { lines, line }
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Literal value as written in source
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Boolean(bool),
}

/// @acp:summary "Statically classified shape of a `return` expression"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnHint {
    Boolean,
    Number,
    String,
    /// Array literal; `nested` when its elements are array literals
    Array { nested: bool },
    Object,
    /// `return;`
    Empty,
    /// Any expression that is not a literal
    Unknown,
}

/// @acp:summary "One formal parameter of a function declaration"
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub name: String,
    pub type_expr: Option<TypeExpr>,
    /// Marked `?` in TypeScript
    pub optional: bool,
    /// Has an initializer (`x = 1`)
    pub has_default: bool,
    /// Rest parameter (`...values`)
    pub rest: bool,
    pub line: usize,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_expr: None,
            optional: false,
            has_default: false,
            rest: false,
            line: 0,
        }
    }

    pub fn with_type(mut self, text: &str) -> Self {
        self.type_expr = Some(TypeExpr::parse(text));
        self
    }
}

/// @acp:summary "A top-level function declaration"
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub doc: Option<DocComment>,
    pub params: Vec<ParamDecl>,
    pub return_type: Option<TypeExpr>,
    pub is_async: bool,
    pub return_hints: Vec<ReturnHint>,
    pub line: usize,
}

impl FunctionDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            params: Vec::new(),
            return_type: None,
            is_async: false,
            return_hints: Vec::new(),
            line: 0,
        }
    }
}

/// One member of an enum declaration
#[derive(Debug, Clone, PartialEq)]
pub struct EnumMemberDecl {
    pub name: String,
    /// Initializer, or the auto-numbered value for members without one
    pub value: Option<Literal>,
    pub doc: Option<DocComment>,
}

/// @acp:summary "An enum declaration (TypeScript only)"
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub name: String,
    pub doc: Option<DocComment>,
    pub members: Vec<EnumMemberDecl>,
    pub line: usize,
}

/// @acp:summary "All declarations of one input file"
#[derive(Debug, Clone, PartialEq)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub language: Language,
    pub functions: Vec<FunctionDecl>,
    pub enums: Vec<EnumDecl>,
}

impl SourceUnit {
    pub fn new(path: impl Into<PathBuf>, language: Language) -> Self {
        Self {
            path: path.into(),
            language,
            functions: Vec::new(),
            enums: Vec::new(),
        }
    }

    /// Path as a display string for diagnostics
    pub fn display_path(&self) -> String {
        self.path.to_string_lossy().replace('\\', "/")
    }
}
