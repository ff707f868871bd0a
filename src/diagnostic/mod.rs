//! @acp:module "Diagnostics"
//! @acp:summary "Per-function and per-enum problems collected during generation"
//! @acp:domain cli
//! @acp:layer model

use serde::{Deserialize, Serialize};

/// @acp:summary "How serious a diagnostic is"
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What kind of declaration a diagnostic is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Function,
    Enum,
}

/// @acp:summary "A single problem found in a function or enum declaration"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub subject: Subject,
    /// Code-level name of the function or enum
    pub subject_name: String,
    pub message: String,
    /// Source line (1-indexed), 0 when unknown
    #[serde(default, skip_serializing_if = "is_zero")]
    pub line: usize,
    /// Input file the declaration came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl Diagnostic {
    pub fn error(subject: Subject, subject_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            subject,
            subject_name: subject_name.into(),
            message: message.into(),
            line: 0,
            file: None,
        }
    }

    pub fn warning(subject: Subject, subject_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(subject, subject_name, message)
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(file) = &self.file {
            if self.line > 0 {
                write!(f, "{}:{}: ", file, self.line)?;
            } else {
                write!(f, "{}: ", file)?;
            }
        }
        write!(f, "{} in {}: {}", self.severity, self.subject_name, self.message)
    }
}

/// Count diagnostics by severity: `(errors, warnings)`
pub fn tally(diagnostics: &[Diagnostic]) -> (usize, usize) {
    diagnostics.iter().fold((0, 0), |(e, w), d| match d.severity {
        Severity::Error => (e + 1, w),
        Severity::Warning => (e, w + 1),
    })
}
