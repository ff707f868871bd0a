//! @acp:module "Tag Parser"
//! @acp:summary "Extracts ordered @tag/value pairs from JSDoc comment blocks"
//! @acp:domain cli
//! @acp:layer parser
//!
//! A tag starts at a line whose first non-blank character is `@` followed by a
//! letter. Its value runs until the next line-leading tag or the end of the
//! block, embedded newlines included. Text before the first tag is the
//! description. An `@` in the middle of a line (`{@link ...}`, e-mail
//! addresses) never starts a tag.

use std::str::FromStr;

use crate::source::DocComment;

/// @acp:summary "Tags with meaning to the metadata generator"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemTag {
    CustomFunction,
    Param,
    Returns,
    HelpUrl,
    Volatile,
    Streaming,
    Cancelable,
    RequiresAddress,
    RequiresParameterAddresses,
    RequiresStreamAddress,
    RequiresStreamParameterAddresses,
    SupportSync,
    CustomEnum,
    LinkedEntityDataProvider,
    LinkedEntityLoadService,
    CapturesCallingObject,
    ExcludeFromAutoComplete,
    Action,
}

impl SystemTag {
    /// Canonical lowercase spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemTag::CustomFunction => "customfunction",
            SystemTag::Param => "param",
            SystemTag::Returns => "returns",
            SystemTag::HelpUrl => "helpurl",
            SystemTag::Volatile => "volatile",
            SystemTag::Streaming => "streaming",
            SystemTag::Cancelable => "cancelable",
            SystemTag::RequiresAddress => "requiresaddress",
            SystemTag::RequiresParameterAddresses => "requiresparameteraddresses",
            SystemTag::RequiresStreamAddress => "requiresstreamaddress",
            SystemTag::RequiresStreamParameterAddresses => "requiresstreamparameteraddresses",
            SystemTag::SupportSync => "supportsync",
            SystemTag::CustomEnum => "customenum",
            SystemTag::LinkedEntityDataProvider => "linkedentitydataprovider",
            SystemTag::LinkedEntityLoadService => "linkedentityloadservice",
            SystemTag::CapturesCallingObject => "capturescallingobject",
            SystemTag::ExcludeFromAutoComplete => "excludefromautocomplete",
            SystemTag::Action => "action",
        }
    }

    /// Spelling used in diagnostics, matching how authors write the tag
    pub fn display_name(&self) -> &'static str {
        match self {
            SystemTag::CustomFunction => "@customfunction",
            SystemTag::Param => "@param",
            SystemTag::Returns => "@returns",
            SystemTag::HelpUrl => "@helpurl",
            SystemTag::Volatile => "@volatile",
            SystemTag::Streaming => "@streaming",
            SystemTag::Cancelable => "@cancelable",
            SystemTag::RequiresAddress => "@requiresAddress",
            SystemTag::RequiresParameterAddresses => "@requiresParameterAddresses",
            SystemTag::RequiresStreamAddress => "@requiresStreamAddress",
            SystemTag::RequiresStreamParameterAddresses => "@requiresStreamParameterAddresses",
            SystemTag::SupportSync => "@supportSync",
            SystemTag::CustomEnum => "@customenum",
            SystemTag::LinkedEntityDataProvider => "@linkedEntityDataProvider",
            SystemTag::LinkedEntityLoadService => "@linkedEntityLoadService",
            SystemTag::CapturesCallingObject => "@capturesCallingObject",
            SystemTag::ExcludeFromAutoComplete => "@excludeFromAutoComplete",
            SystemTag::Action => "@action",
        }
    }
}

impl FromStr for SystemTag {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "customfunction" => Ok(SystemTag::CustomFunction),
            "param" => Ok(SystemTag::Param),
            "returns" | "return" => Ok(SystemTag::Returns),
            "helpurl" => Ok(SystemTag::HelpUrl),
            "volatile" => Ok(SystemTag::Volatile),
            "streaming" => Ok(SystemTag::Streaming),
            "cancelable" => Ok(SystemTag::Cancelable),
            "requiresaddress" => Ok(SystemTag::RequiresAddress),
            "requiresparameteraddresses" => Ok(SystemTag::RequiresParameterAddresses),
            "requiresstreamaddress" => Ok(SystemTag::RequiresStreamAddress),
            "requiresstreamparameteraddresses" => Ok(SystemTag::RequiresStreamParameterAddresses),
            "supportsync" => Ok(SystemTag::SupportSync),
            "customenum" => Ok(SystemTag::CustomEnum),
            "linkedentitydataprovider" => Ok(SystemTag::LinkedEntityDataProvider),
            "linkedentityloadservice" => Ok(SystemTag::LinkedEntityLoadService),
            "capturescallingobject" => Ok(SystemTag::CapturesCallingObject),
            "excludefromautocomplete" => Ok(SystemTag::ExcludeFromAutoComplete),
            "action" => Ok(SystemTag::Action),
            _ => Err(format!("Unknown tag: @{}", s)),
        }
    }
}

impl std::fmt::Display for SystemTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// @acp:summary "A single tag extracted from a comment"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTag {
    /// Canonical lowercase name for system tags, original spelling otherwise
    pub name: String,
    /// Set when the tag is one the generator understands
    pub kind: Option<SystemTag>,
    /// Everything after the tag name up to the next tag, newlines included
    pub raw_value: String,
    /// Source line (1-indexed) of the tag marker
    pub line: usize,
}

/// @acp:summary "Ordered tags plus free-text description of one comment"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    pub description: String,
    pub tags: Vec<ParsedTag>,
}

impl TagSet {
    /// First occurrence wins for single-valued tags
    pub fn first(&self, kind: SystemTag) -> Option<&ParsedTag> {
        self.tags.iter().find(|t| t.kind == Some(kind))
    }

    pub fn all(&self, kind: SystemTag) -> impl Iterator<Item = &ParsedTag> {
        self.tags.iter().filter(move |t| t.kind == Some(kind))
    }

    pub fn has(&self, kind: SystemTag) -> bool {
        self.first(kind).is_some()
    }

    pub fn count(&self, kind: SystemTag) -> usize {
        self.all(kind).count()
    }
}

/// @acp:summary "Lex a doc comment into description and tags"
pub fn parse_tags(doc: &DocComment) -> TagSet {
    let mut description: Vec<&str> = Vec::new();
    let mut tags: Vec<ParsedTag> = Vec::new();
    let mut current: Option<(ParsedTag, Vec<&str>)> = None;

    for (offset, line) in doc.lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if let Some((name, rest)) = split_tag_marker(trimmed) {
            if let Some((tag, value_lines)) = current.take() {
                tags.push(finish_tag(tag, &value_lines));
            }
            let kind = name.parse::<SystemTag>().ok();
            let tag = ParsedTag {
                name: kind.map(|k| k.as_str().to_string()).unwrap_or_else(|| name.to_string()),
                kind,
                raw_value: String::new(),
                line: doc.line + offset,
            };
            current = Some((tag, vec![rest.trim_start()]));
        } else if let Some((_, value_lines)) = current.as_mut() {
            value_lines.push(line.as_str());
        } else {
            description.push(line.trim());
        }
    }

    if let Some((tag, value_lines)) = current.take() {
        tags.push(finish_tag(tag, &value_lines));
    }

    TagSet {
        description: description.join("\n").trim().to_string(),
        tags,
    }
}

/// Returns `(name, rest)` when the line begins with `@name`
fn split_tag_marker(line: &str) -> Option<(&str, &str)> {
    let body = line.strip_prefix('@')?;
    if !body.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let end = body
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(body.len());
    Some((&body[..end], &body[end..]))
}

fn finish_tag(mut tag: ParsedTag, value_lines: &[&str]) -> ParsedTag {
    tag.raw_value = value_lines.join("\n").trim().to_string();
    tag
}

/// @acp:summary "Split a leading brace-balanced {type} block from a tag value"
/// Returns the type text (without braces) and the remainder.
pub fn split_type_block(value: &str) -> (Option<&str>, &str) {
    let value = value.trim_start();
    if !value.starts_with('{') {
        return (None, value);
    }
    let mut depth = 0usize;
    for (idx, c) in value.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return (Some(value[1..idx].trim()), value[idx + 1..].trim_start());
                }
            }
            _ => {}
        }
    }
    // Unbalanced: treat the whole value as the type so the resolver can reject it
    (Some(value[1..].trim()), "")
}

/// @acp:summary "Parsed @param tag value"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamTag {
    pub type_text: Option<String>,
    pub name: String,
    /// `[name]` or `[name=default]`
    pub optional: bool,
    pub default: Option<String>,
    pub description: String,
}

impl ParamTag {
    /// @acp:summary "Parse `{Type} [name=default] description`"
    pub fn parse(value: &str) -> Option<Self> {
        let (type_text, rest) = split_type_block(value);
        let rest = rest.trim_start();

        let (optional, name, default, remaining) = if let Some(inner) = rest.strip_prefix('[') {
            let close = inner.find(']')?;
            let bracketed = &inner[..close];
            let remaining = &inner[close + 1..];
            match bracketed.split_once('=') {
                Some((n, d)) => (true, n.trim().to_string(), Some(d.trim().to_string()), remaining),
                None => (true, bracketed.trim().to_string(), None, remaining),
            }
        } else {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            (false, rest[..end].to_string(), None, &rest[end..])
        };

        if name.is_empty() {
            return None;
        }

        Some(Self {
            type_text: type_text.map(str::to_string),
            name,
            optional,
            default,
            description: clean_description(remaining),
        })
    }
}

/// @acp:summary "Parsed @returns tag value"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnsTag {
    pub type_text: Option<String>,
    pub description: String,
}

impl ReturnsTag {
    pub fn parse(value: &str) -> Self {
        let (type_text, rest) = split_type_block(value);
        Self {
            type_text: type_text.map(str::to_string),
            description: clean_description(rest),
        }
    }
}

/// Strip the optional ` - ` separator JSDoc allows between name and text
fn clean_description(text: &str) -> String {
    let text = text.trim();
    let text = text.strip_prefix("- ").or_else(|| text.strip_prefix('-')).unwrap_or(text);
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> DocComment {
        DocComment::from_block(text, 1)
    }

    #[test]
    fn test_description_and_tags() {
        let set = parse_tags(&doc(
            "/**\n * Adds two numbers.\n * Second line.\n * @customfunction\n * @param first First number\n * @returns The sum\n */",
        ));
        assert_eq!(set.description, "Adds two numbers.\nSecond line.");
        assert_eq!(set.tags.len(), 3);
        assert_eq!(set.tags[0].kind, Some(SystemTag::CustomFunction));
        assert_eq!(set.tags[1].raw_value, "first First number");
        assert_eq!(set.tags[2].kind, Some(SystemTag::Returns));
        assert_eq!(set.tags[1].line, 5);
    }

    #[test]
    fn test_case_insensitive_system_tags() {
        let set = parse_tags(&doc("/** @supportSync\n * @RequiresAddress\n * @Return {number} x */"));
        assert!(set.has(SystemTag::SupportSync));
        assert!(set.has(SystemTag::RequiresAddress));
        assert_eq!(set.tags[0].name, "supportsync");
        assert_eq!(set.first(SystemTag::Returns).unwrap().raw_value, "{number} x");
    }

    #[test]
    fn test_unknown_tags_keep_case() {
        let set = parse_tags(&doc("/** @customfunction\n * @SeeAlso Other */"));
        assert_eq!(set.tags[1].name, "SeeAlso");
        assert_eq!(set.tags[1].kind, None);
    }

    #[test]
    fn test_multiline_value_and_inline_at() {
        let set = parse_tags(&doc(
            "/**\n * @helpurl https://contoso.com/\n *   help/add\n * @param x mail me@contoso.com {@link Foo}\n */",
        ));
        assert_eq!(set.tags.len(), 2);
        assert_eq!(set.tags[0].raw_value, "https://contoso.com/\n  help/add");
        assert_eq!(set.tags[1].raw_value, "x mail me@contoso.com {@link Foo}");
    }

    #[test]
    fn test_duplicate_tags_first_wins() {
        let set = parse_tags(&doc("/** @helpurl first\n * @helpurl second */"));
        assert_eq!(set.count(SystemTag::HelpUrl), 2);
        assert_eq!(set.first(SystemTag::HelpUrl).unwrap().raw_value, "first");
    }

    #[test]
    fn test_param_tag_forms() {
        let p = ParamTag::parse("{number} first First number").unwrap();
        assert_eq!(p.type_text.as_deref(), Some("number"));
        assert_eq!(p.name, "first");
        assert!(!p.optional);
        assert_eq!(p.description, "First number");

        let p = ParamTag::parse("{string} [label=\"x\"] - The label").unwrap();
        assert!(p.optional);
        assert_eq!(p.name, "label");
        assert_eq!(p.default.as_deref(), Some("\"x\""));
        assert_eq!(p.description, "The label");

        let p = ParamTag::parse("{{ a: number }} obj").unwrap();
        assert_eq!(p.type_text.as_deref(), Some("{ a: number }"));
        assert_eq!(p.name, "obj");

        let p = ParamTag::parse("values").unwrap();
        assert_eq!(p.type_text, None);
        assert_eq!(p.description, "");

        assert!(ParamTag::parse("{number}").is_none());
    }

    #[test]
    fn test_returns_tag() {
        let r = ReturnsTag::parse("{number[][]} A matrix");
        assert_eq!(r.type_text.as_deref(), Some("number[][]"));
        assert_eq!(r.description, "A matrix");

        let r = ReturnsTag::parse("Sum of inputs");
        assert_eq!(r.type_text, None);
        assert_eq!(r.description, "Sum of inputs");
    }
}
