//! @acp:module "Enum Registry"
//! @acp:summary "Collects and validates @customenum declarations before functions are processed"
//! @acp:domain cli
//! @acp:layer service
//!
//! Functions may reference enums declared anywhere in the file, so the
//! registry is filled in a separate pass and is read-only afterwards.
//! Invalid enums stay registered so lookups can tell "invalid" apart from
//! "unknown"; only valid ones reach the metadata document.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Serialize, Serializer};

use crate::diagnostic::{Diagnostic, Subject};
use crate::parse::{parse_tags, split_type_block, SystemTag};
use crate::source::{EnumDecl, Literal, SourceUnit};
use crate::types::EnumBaseType;

/// Enum identifiers: leading letter, then letters, digits or `_`, at most 128 chars
static ENUM_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]{0,127}$").unwrap());

/// Value of one enum member
#[derive(Debug, Clone, PartialEq)]
pub enum EnumValue {
    Number(f64),
    String(String),
}

impl EnumValue {
    pub fn base_type(&self) -> EnumBaseType {
        match self {
            EnumValue::Number(_) => EnumBaseType::Number,
            EnumValue::String(_) => EnumBaseType::String,
        }
    }
}

impl Serialize for EnumValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            // Integral values are written without a trailing `.0`
            EnumValue::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => serializer.serialize_i64(*n as i64),
            EnumValue::Number(n) => serializer.serialize_f64(*n),
            EnumValue::String(s) => serializer.serialize_str(s),
        }
    }
}

/// @acp:summary "A validated enum member"
#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub name: String,
    pub value: EnumValue,
    pub description: String,
}

/// @acp:summary "A validated custom enum"
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDescriptor {
    pub name: String,
    pub underlying: EnumBaseType,
    pub description: String,
    pub members: Vec<EnumMember>,
}

/// @acp:summary "Registry entry: valid descriptor or rejected enum"
#[derive(Debug, Clone, PartialEq)]
pub enum RegisteredEnum {
    Valid(EnumDescriptor),
    Invalid { name: String, reason: String },
}

impl RegisteredEnum {
    pub fn name(&self) -> &str {
        match self {
            RegisteredEnum::Valid(desc) => &desc.name,
            RegisteredEnum::Invalid { name, .. } => name,
        }
    }
}

/// @acp:summary "Lookup table of custom enums for one source unit"
#[derive(Debug, Clone, Default)]
pub struct EnumRegistry {
    entries: Vec<RegisteredEnum>,
    by_name: HashMap<String, usize>,
}

impl EnumRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// @acp:summary "Scan every @customenum declaration of a unit"
    pub fn scan(unit: &SourceUnit) -> (Self, Vec<Diagnostic>) {
        let mut registry = Self::new();
        let mut diagnostics = Vec::new();
        let file = unit.display_path();

        for decl in &unit.enums {
            let Some(doc) = &decl.doc else { continue };
            let tags = parse_tags(doc);
            let Some(tag) = tags.first(SystemTag::CustomEnum) else { continue };

            let mut problems = Vec::new();
            let declared = split_type_block(&tag.raw_value).0;
            let outcome = check_enum(decl, declared, &tags.description, &mut problems);

            if !ENUM_NAME_PATTERN.is_match(&decl.name) {
                problems.insert(
                    0,
                    format!(
                        "Invalid custom enum name \"{}\": names must start with a letter, contain only letters, digits or '_' and be at most 128 characters",
                        decl.name
                    ),
                );
            }

            let key = decl.name.to_lowercase();
            let duplicate = registry.by_name.contains_key(&key);
            if duplicate {
                problems.insert(0, format!("Duplicate custom enum name \"{}\"", decl.name));
            }

            let entry = match outcome {
                Some(desc) if problems.is_empty() => {
                    tracing::debug!("Registered custom enum {}", desc.name);
                    RegisteredEnum::Valid(desc)
                }
                _ => {
                    for problem in &problems {
                        tracing::warn!("Rejected custom enum {}: {}", decl.name, problem);
                        diagnostics.push(
                            Diagnostic::error(Subject::Enum, &decl.name, problem.clone())
                                .at_line(decl.line)
                                .in_file(file.clone()),
                        );
                    }
                    RegisteredEnum::Invalid {
                        name: decl.name.clone(),
                        reason: problems.first().cloned().unwrap_or_default(),
                    }
                }
            };

            registry.entries.push(entry);
            if !duplicate {
                registry.by_name.insert(key, registry.entries.len() - 1);
            }
        }

        (registry, diagnostics)
    }

    /// @acp:summary "Find a registered enum by name"
    pub fn by_name(&self, name: &str) -> Option<&RegisteredEnum> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|&idx| &self.entries[idx])
            .filter(|entry| entry.name() == name)
    }

    /// Valid enums in declaration order
    pub fn valid(&self) -> impl Iterator<Item = &EnumDescriptor> {
        self.entries.iter().filter_map(|entry| match entry {
            RegisteredEnum::Valid(desc) => Some(desc),
            RegisteredEnum::Invalid { .. } => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Validate member shape; pushes problems and returns a descriptor when the
/// members themselves are consistent
fn check_enum(
    decl: &EnumDecl,
    declared: Option<&str>,
    description: &str,
    problems: &mut Vec<String>,
) -> Option<EnumDescriptor> {
    let declared_type = match declared.map(str::trim) {
        None | Some("") => None,
        Some(text) => match text.to_lowercase().as_str() {
            "number" => Some(EnumBaseType::Number),
            "string" => Some(EnumBaseType::String),
            _ => {
                problems.push(format!(
                    "Unsupported custom enum type \"{}\": only \"string\" and \"number\" are allowed",
                    text
                ));
                return None;
            }
        },
    };

    if decl.members.is_empty() {
        problems.push(format!("Custom enum \"{}\" has no members", decl.name));
        return None;
    }

    let mut members = Vec::with_capacity(decl.members.len());
    for member in &decl.members {
        let value = match &member.value {
            Some(Literal::Number(n)) => EnumValue::Number(*n),
            Some(Literal::String(s)) => EnumValue::String(s.clone()),
            Some(Literal::Boolean(_)) => {
                problems.push(format!(
                    "Member \"{}\" has a boolean value; custom enum values must be strings or numbers",
                    member.name
                ));
                continue;
            }
            None => {
                problems.push(format!(
                    "Member \"{}\" has no constant value",
                    member.name
                ));
                continue;
            }
        };
        let description = member
            .doc
            .as_ref()
            .map(|doc| parse_tags(doc).description)
            .unwrap_or_default();
        members.push(EnumMember {
            name: member.name.clone(),
            value,
            description,
        });
    }

    if !problems.is_empty() {
        return None;
    }

    let first_type = members[0].value.base_type();
    if members.iter().any(|m| m.value.base_type() != first_type) {
        problems.push(format!(
            "Custom enum \"{}\" mixes string and number values",
            decl.name
        ));
        return None;
    }

    if let Some(declared_type) = declared_type {
        if declared_type != first_type {
            problems.push(format!(
                "Custom enum \"{}\" is declared as {} but its values are {}s",
                decl.name,
                declared_type.as_str(),
                first_type.as_str()
            ));
            return None;
        }
    }

    Some(EnumDescriptor {
        name: decl.name.clone(),
        underlying: first_type,
        description: description.to_string(),
        members,
    })
}
