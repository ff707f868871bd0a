//! @acp:module "Validation Engine"
//! @acp:summary "Applies the custom function rule set to candidate descriptors"
//! @acp:domain cli
//! @acp:layer service
//!
//! Every check runs on every candidate so authors see all problems at once.
//! A candidate with any error-severity diagnostic is rejected; warnings
//! never reject.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::diagnostic::{Diagnostic, Subject};
use crate::parse::SystemTag;
use crate::signature::{Candidate, FunctionDescriptor};
use crate::types::{InvocationKind, TypeExpr};

/// Function ids and names: leading letter or `_`, then letters, digits, `_` or `.`
static FUNCTION_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]{0,127}$").unwrap());

/// Tags that may not appear together on one function
const EXCLUSIVE_PAIRS: &[(SystemTag, SystemTag)] = &[
    (SystemTag::SupportSync, SystemTag::Streaming),
    (SystemTag::SupportSync, SystemTag::Volatile),
    (SystemTag::LinkedEntityDataProvider, SystemTag::CapturesCallingObject),
    (SystemTag::LinkedEntityDataProvider, SystemTag::ExcludeFromAutoComplete),
    (SystemTag::LinkedEntityDataProvider, SystemTag::RequiresAddress),
    (SystemTag::LinkedEntityDataProvider, SystemTag::RequiresParameterAddresses),
    (SystemTag::LinkedEntityDataProvider, SystemTag::Streaming),
    (SystemTag::LinkedEntityDataProvider, SystemTag::Volatile),
    (SystemTag::LinkedEntityLoadService, SystemTag::CapturesCallingObject),
    (SystemTag::LinkedEntityLoadService, SystemTag::ExcludeFromAutoComplete),
    (SystemTag::LinkedEntityLoadService, SystemTag::RequiresAddress),
    (SystemTag::LinkedEntityLoadService, SystemTag::RequiresParameterAddresses),
    (SystemTag::LinkedEntityLoadService, SystemTag::Streaming),
    (SystemTag::LinkedEntityLoadService, SystemTag::Volatile),
];

/// Lifecycle of one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationState {
    Pending,
    Accepted,
    Rejected,
}

/// @acp:summary "A candidate together with its verdict and diagnostics"
#[derive(Debug, Clone)]
pub struct Review {
    pub function: FunctionDescriptor,
    pub state: ValidationState,
    pub diagnostics: Vec<Diagnostic>,
}

impl Review {
    fn pending(candidate: Candidate) -> Self {
        Self {
            function: candidate.function,
            state: ValidationState::Pending,
            diagnostics: candidate.diagnostics,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.state == ValidationState::Accepted
    }

    fn error(&mut self, message: impl Into<String>) {
        let diagnostic = Diagnostic::error(Subject::Function, &self.function.code_name, message)
            .at_line(self.function.line);
        self.diagnostics.push(diagnostic);
    }

    fn decide(mut self) -> Self {
        self.state = if self.diagnostics.iter().any(Diagnostic::is_error) {
            ValidationState::Rejected
        } else {
            ValidationState::Accepted
        };
        self
    }
}

/// @acp:summary "Tracks accepted ids and names; the first occurrence wins"
#[derive(Debug, Clone, Default)]
pub struct DuplicateTracker {
    /// Lowercased id to the code name that claimed it
    ids: HashMap<String, String>,
    names: HashMap<String, String>,
}

impl DuplicateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages for every collision with an already accepted function
    pub fn conflicts(&self, id: &str, name: &str) -> Vec<String> {
        let mut messages = Vec::new();
        if let Some(owner) = self.ids.get(&id.to_lowercase()) {
            messages.push(format!(
                "Duplicate function id \"{}\" (already used by \"{}\")",
                id, owner
            ));
        }
        if let Some(owner) = self.names.get(name) {
            messages.push(format!(
                "Duplicate function name \"{}\" (already used by \"{}\")",
                name, owner
            ));
        }
        messages
    }

    pub fn record(&mut self, id: &str, name: &str, code_name: &str) {
        self.ids
            .entry(id.to_lowercase())
            .or_insert_with(|| code_name.to_string());
        self.names
            .entry(name.to_string())
            .or_insert_with(|| code_name.to_string());
    }
}

/// @acp:summary "Validates candidates of one run in source order"
#[derive(Debug, Default)]
pub struct Validator {
    accepted: DuplicateTracker,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// @acp:summary "Run every check and settle the candidate's state"
    pub fn review(&mut self, candidate: Candidate) -> Review {
        let mut review = Review::pending(candidate);

        for message in self.accepted.conflicts(&review.function.id, &review.function.name) {
            review.error(message);
        }
        check_identifiers(&mut review);
        check_types(&mut review);
        check_exclusions(&mut review);
        check_invocation(&mut review);
        check_parameter_order(&mut review);

        let review = review.decide();
        if review.is_accepted() {
            let f = &review.function;
            self.accepted.record(&f.id, &f.name, &f.code_name);
            tracing::debug!("Accepted custom function {} ({})", f.id, f.code_name);
        } else {
            tracing::warn!(
                "Rejected custom function {} with {} diagnostic(s)",
                review.function.code_name,
                review.diagnostics.len()
            );
        }
        review
    }
}

fn check_identifiers(review: &mut Review) {
    let id = review.function.id.clone();
    let name = review.function.name.clone();
    if !FUNCTION_ID_PATTERN.is_match(&id) {
        review.error(format!(
            "Invalid function id \"{}\": ids start with a letter or underscore and may contain letters, digits, underscores and periods, up to 128 characters",
            id
        ));
    }
    if !FUNCTION_ID_PATTERN.is_match(&name) {
        review.error(format!(
            "Invalid function name \"{}\": names start with a letter or underscore and may contain letters, digits, underscores and periods, up to 128 characters",
            name
        ));
    }
}

fn check_types(review: &mut Review) {
    let mut messages = Vec::new();
    // An invocation's inner type is the result and is checked there
    for param in review.function.parameters.iter().filter(|p| p.invocation.is_none()) {
        if let Some(reason) = param.ty.unsupported_reason() {
            messages.push(format!("Unsupported type for parameter \"{}\": {}", param.name, reason));
        }
    }
    if let Some(reason) = review.function.result.unsupported_reason() {
        messages.push(format!("Unsupported result type: {}", reason));
    }
    for message in messages {
        review.error(message);
    }
}

fn check_exclusions(review: &mut Review) {
    let options = review.function.options.clone();
    for (first, second) in EXCLUSIVE_PAIRS {
        if options.is_set(*first) && options.is_set(*second) {
            review.error(format!(
                "{} cannot be combined with {}",
                first.display_name(),
                second.display_name()
            ));
        }
    }
}

fn check_invocation(review: &mut Review) {
    let function = &review.function;
    let options = &function.options;
    let kinds: Vec<(usize, InvocationKind)> = function
        .parameters
        .iter()
        .enumerate()
        .filter_map(|(idx, p)| p.invocation.map(|kind| (idx, kind)))
        .collect();
    let invocation = kinds.first().map(|(_, kind)| *kind);
    let last = function.parameters.len().saturating_sub(1);

    let mut messages = Vec::new();

    if kinds.len() > 1 {
        messages.push("Only one invocation parameter is allowed".to_string());
    }
    if let Some((idx, kind)) = kinds.first() {
        if *idx != last {
            messages.push(format!(
                "{} parameter \"{}\" must be the last parameter",
                kind.type_name(),
                function.parameters[*idx].name
            ));
        }
    }

    let streaming = matches!(invocation, Some(InvocationKind::Streaming));
    let cancelable = matches!(
        invocation,
        Some(InvocationKind::Cancelable) | Some(InvocationKind::Streaming)
    );
    let mut require = |tag: SystemTag, satisfied: bool, expected: InvocationKind| {
        if options.is_set(tag) && !satisfied {
            messages.push(format!(
                "{}: missing invocation parameter (expected {} as the last parameter)",
                tag.display_name(),
                expected.type_name()
            ));
        }
    };

    require(SystemTag::Streaming, streaming, InvocationKind::Streaming);
    require(SystemTag::Cancelable, cancelable, InvocationKind::Cancelable);
    let address_kind = if options.stream {
        InvocationKind::Streaming
    } else {
        InvocationKind::Invocation
    };
    let address_ok = if options.stream { streaming } else { invocation.is_some() };
    require(SystemTag::RequiresAddress, address_ok, address_kind);
    require(SystemTag::RequiresParameterAddresses, address_ok, address_kind);
    require(SystemTag::RequiresStreamAddress, streaming, InvocationKind::Streaming);
    require(
        SystemTag::RequiresStreamParameterAddresses,
        streaming,
        InvocationKind::Streaming,
    );
    require(
        SystemTag::SupportSync,
        invocation == Some(InvocationKind::Invocation),
        InvocationKind::Invocation,
    );

    if options.stream {
        if let Some(declared) = &function.declared_return {
            if !is_void(declared) {
                messages.push(format!(
                    "Streaming functions must return void, found \"{}\"",
                    declared
                ));
            }
        }
    }

    for message in messages {
        review.error(message);
    }
}

fn is_void(expr: &TypeExpr) -> bool {
    match expr {
        TypeExpr::Named(name) => name == "void",
        TypeExpr::Generic { name, args } if name == "Promise" => {
            matches!(args.as_slice(), [inner] if is_void(inner))
        }
        _ => false,
    }
}

fn check_parameter_order(review: &mut Review) {
    let visible: Vec<_> = review.function.visible_parameters().collect();
    let mut messages = Vec::new();

    if let Some((_, param)) = visible
        .iter()
        .enumerate()
        .find(|(idx, p)| p.repeating && *idx + 1 != visible.len())
    {
        messages.push(format!(
            "Repeating parameter \"{}\" must be the last parameter",
            param.name
        ));
    }

    let mut first_optional: Option<&str> = None;
    for param in &visible {
        if param.optional {
            first_optional.get_or_insert(param.name.as_str());
        } else if let Some(optional) = first_optional {
            if !param.repeating {
                messages.push(format!(
                    "Required parameter \"{}\" cannot follow optional parameter \"{}\"",
                    param.name, optional
                ));
            }
        }
    }

    for message in messages {
        review.error(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{FunctionOptions, ParameterDescriptor};
    use crate::types::TypeDescriptor;

    fn function(id: &str) -> FunctionDescriptor {
        FunctionDescriptor {
            id: id.to_string(),
            name: id.to_string(),
            code_name: id.to_lowercase(),
            description: String::new(),
            help_url: None,
            parameters: Vec::new(),
            result: TypeDescriptor::Number,
            options: FunctionOptions::default(),
            declared_return: None,
            line: 1,
        }
    }

    fn param(name: &str, ty: TypeDescriptor) -> ParameterDescriptor {
        ParameterDescriptor {
            name: name.to_string(),
            invocation: ty.invocation_kind(),
            ty,
            description: String::new(),
            optional: false,
            repeating: false,
            line: 1,
        }
    }

    fn invocation(kind: InvocationKind) -> TypeDescriptor {
        TypeDescriptor::Invocation { kind, result: None }
    }

    fn review(function: FunctionDescriptor) -> Review {
        Validator::new().review(Candidate {
            function,
            diagnostics: Vec::new(),
        })
    }

    #[test]
    fn test_valid_function_is_accepted() {
        let mut f = function("ADD");
        f.parameters.push(param("first", TypeDescriptor::Number));
        let r = review(f);
        assert!(r.is_accepted());
        assert!(r.diagnostics.is_empty());
    }

    #[test]
    fn test_duplicate_id_first_wins() {
        let mut validator = Validator::new();
        let first = validator.review(Candidate {
            function: function("DUPLICATE"),
            diagnostics: Vec::new(),
        });
        let mut later = function("duplicate");
        later.name = "OTHER".to_string();
        let second = validator.review(Candidate {
            function: later,
            diagnostics: Vec::new(),
        });
        assert!(first.is_accepted());
        assert_eq!(second.state, ValidationState::Rejected);
        assert!(second.diagnostics[0].message.contains("Duplicate function id"));
    }

    #[test]
    fn test_rejected_function_does_not_claim_id() {
        let mut validator = Validator::new();
        let mut bad = function("SAME");
        bad.result = TypeDescriptor::unsupported("nope");
        assert!(!validator
            .review(Candidate { function: bad, diagnostics: Vec::new() })
            .is_accepted());
        assert!(validator
            .review(Candidate { function: function("SAME"), diagnostics: Vec::new() })
            .is_accepted());
    }

    #[test]
    fn test_id_grammar() {
        assert!(!review(function("1ADD")).is_accepted());
        assert!(!review(function("ADD-ONE")).is_accepted());
        assert!(review(function("_MATH.ADD")).is_accepted());
        assert!(!review(function(&"A".repeat(129))).is_accepted());
    }

    #[test]
    fn test_mutual_exclusion_names_both_tags() {
        let mut f = function("SYNC");
        f.options.support_sync = true;
        f.options.stream = true;
        let r = review(f);
        assert!(!r.is_accepted());
        assert!(r
            .diagnostics
            .iter()
            .any(|d| d.message.contains("@supportSync") && d.message.contains("@streaming")));
    }

    #[test]
    fn test_linked_entity_exclusions() {
        let mut f = function("LOAD");
        f.options.linked_entity_load_service = true;
        f.options.volatile = true;
        assert!(!review(f).is_accepted());
    }

    #[test]
    fn test_requires_address_needs_invocation() {
        let mut f = function("ADDR");
        f.options.requires_address = true;
        let r = review(f);
        assert!(!r.is_accepted());
        assert!(r.diagnostics[0].message.contains("missing invocation parameter"));

        let mut f = function("ADDR");
        f.options.requires_address = true;
        f.parameters.push(param("inv", invocation(InvocationKind::Invocation)));
        assert!(review(f).is_accepted());
    }

    #[test]
    fn test_invocation_must_be_last() {
        let mut f = function("INV");
        f.parameters.push(param("inv", invocation(InvocationKind::Invocation)));
        f.parameters.push(param("x", TypeDescriptor::Number));
        assert!(!review(f).is_accepted());
    }

    #[test]
    fn test_streaming_must_return_void() {
        let mut f = function("TICK");
        f.options.stream = true;
        f.parameters.push(param("inv", invocation(InvocationKind::Streaming)));
        f.declared_return = Some(TypeExpr::parse("number"));
        assert!(!review(f.clone()).is_accepted());

        f.declared_return = Some(TypeExpr::parse("void"));
        assert!(review(f).is_accepted());
    }

    #[test]
    fn test_parameter_order() {
        let mut f = function("ORDER");
        let mut optional = param("a", TypeDescriptor::Number);
        optional.optional = true;
        f.parameters.push(optional);
        f.parameters.push(param("b", TypeDescriptor::Number));
        assert!(!review(f).is_accepted());

        let mut f = function("REPEAT");
        let mut repeating = param("a", TypeDescriptor::Number);
        repeating.repeating = true;
        f.parameters.push(repeating);
        f.parameters.push(param("b", TypeDescriptor::Number));
        assert!(!review(f).is_accepted());
    }

    #[test]
    fn test_unsupported_parameter_named() {
        let mut f = function("BAD");
        f.parameters.push(param("grid", TypeDescriptor::unsupported("too deep")));
        let r = review(f);
        assert!(r.diagnostics[0].message.contains("\"grid\""));
    }

    #[test]
    fn test_streaming_result_reported_once() {
        let inner = TypeDescriptor::unsupported("too deep");
        let mut f = function("TICK");
        f.options.stream = true;
        f.options.cancelable = true;
        f.parameters.push(param(
            "inv",
            TypeDescriptor::Invocation {
                kind: InvocationKind::Streaming,
                result: Some(Box::new(inner.clone())),
            },
        ));
        f.result = inner;
        let r = review(f);
        assert!(!r.is_accepted());
        let unsupported: Vec<_> = r
            .diagnostics
            .iter()
            .filter(|d| d.message.starts_with("Unsupported"))
            .collect();
        assert_eq!(unsupported.len(), 1);
        assert!(unsupported[0].message.contains("result"));
    }

    #[test]
    fn test_extraction_errors_reject() {
        let r = Validator::new().review(Candidate {
            function: function("X"),
            diagnostics: vec![Diagnostic::error(Subject::Function, "x", "bad tag")],
        });
        assert_eq!(r.state, ValidationState::Rejected);
    }
}
