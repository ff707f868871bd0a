//! @acp:module "Type Expressions"
//! @acp:summary "Parser for TypeScript annotations and JSDoc {type} blocks"
//! @acp:domain cli
//! @acp:layer parser
//!
//! Code-level annotations (`: number[][]`) and tag-level annotations
//! (`{Array.<number>}`) are parsed into the same [`TypeExpr`] tree so the
//! resolver has a single input shape. Parsing never fails: anything the
//! grammar does not cover becomes [`TypeExpr::Invalid`] carrying the text.

use std::fmt;

/// Kind of a literal type such as `"a"`, `42` or `true`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Boolean,
    Number,
    String,
}

/// @acp:summary "A parsed type expression"
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// Keyword or (possibly qualified) type reference: `number`, `Excel.CellValue`
    Named(String),
    /// Reference with type arguments: `Array<T>`, `Promise<T>`
    Generic { name: String, args: Vec<TypeExpr> },
    /// `T[]`
    Array(Box<TypeExpr>),
    /// `A | B`
    Union(Vec<TypeExpr>),
    /// `[A, B]`
    Tuple(Vec<TypeExpr>),
    /// `"text"`, `1`, `true`
    Literal(LiteralKind),
    /// Type literal `{ a: number }`
    Object,
    /// `(a: number) => string`
    Function,
    /// JSDoc variadic `...T`
    Rest(Box<TypeExpr>),
    /// JSDoc optional `T=`
    Optional(Box<TypeExpr>),
    /// Text the grammar does not cover
    Invalid(String),
}

impl TypeExpr {
    /// @acp:summary "Parse a type expression, falling back to Invalid"
    pub fn parse(text: &str) -> TypeExpr {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return TypeExpr::Invalid(String::new());
        }
        let tokens = match tokenize(trimmed) {
            Some(tokens) => tokens,
            None => return TypeExpr::Invalid(trimmed.to_string()),
        };
        let mut parser = TypeParser { tokens, pos: 0 };
        match parser.parse_top() {
            Some(expr) if parser.at_end() => expr,
            _ => TypeExpr::Invalid(trimmed.to_string()),
        }
    }

    /// Name of a plain reference, if this is one
    pub fn as_named(&self) -> Option<&str> {
        match self {
            TypeExpr::Named(name) => Some(name),
            _ => None,
        }
    }

    /// Number of `[]` / `Array<>` levels wrapping the innermost element
    pub fn array_depth(&self) -> usize {
        match self.array_element() {
            Some(inner) => 1 + inner.array_depth(),
            None => 0,
        }
    }

    /// Element type when this is an array in either spelling
    pub fn array_element(&self) -> Option<&TypeExpr> {
        match self {
            TypeExpr::Array(inner) => Some(inner),
            TypeExpr::Generic { name, args }
                if args.len() == 1 && matches!(name.as_str(), "Array" | "ReadonlyArray") =>
            {
                Some(&args[0])
            }
            _ => None,
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named(name) => write!(f, "{}", name),
            TypeExpr::Generic { name, args } => {
                write!(f, "{}<", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ">")
            }
            TypeExpr::Array(inner) => match inner.as_ref() {
                TypeExpr::Union(_) | TypeExpr::Function => write!(f, "({})[]", inner),
                _ => write!(f, "{}[]", inner),
            },
            TypeExpr::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", member)?;
                }
                Ok(())
            }
            TypeExpr::Tuple(members) => {
                write!(f, "[")?;
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", member)?;
                }
                write!(f, "]")
            }
            TypeExpr::Literal(LiteralKind::Boolean) => write!(f, "boolean literal"),
            TypeExpr::Literal(LiteralKind::Number) => write!(f, "number literal"),
            TypeExpr::Literal(LiteralKind::String) => write!(f, "string literal"),
            TypeExpr::Object => write!(f, "{{...}}"),
            TypeExpr::Function => write!(f, "function"),
            TypeExpr::Rest(inner) => write!(f, "...{}", inner),
            TypeExpr::Optional(inner) => write!(f, "{}=", inner),
            TypeExpr::Invalid(text) => write!(f, "{}", text),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number,
    Str,
    Ellipsis,
    Arrow,
    Punct(char),
}

fn tokenize(text: &str) -> Option<Vec<Token>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_alphabetic() || c == '_' || c == '$' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) {
            i += 1;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.' || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Number);
        } else if c == '"' || c == '\'' || c == '`' {
            i += 1;
            while i < chars.len() && chars[i] != c {
                if chars[i] == '\\' {
                    i += 1;
                }
                i += 1;
            }
            if i >= chars.len() {
                return None;
            }
            i += 1;
            tokens.push(Token::Str);
        } else if c == '.' && chars.get(i + 1) == Some(&'.') && chars.get(i + 2) == Some(&'.') {
            i += 3;
            tokens.push(Token::Ellipsis);
        } else if c == '=' && chars.get(i + 1) == Some(&'>') {
            i += 2;
            tokens.push(Token::Arrow);
        } else {
            i += 1;
            tokens.push(Token::Punct(c));
        }
    }

    Some(tokens)
}

struct TypeParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl TypeParser {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(&Token::Punct(c)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_top(&mut self) -> Option<TypeExpr> {
        if self.peek() == Some(&Token::Ellipsis) {
            self.pos += 1;
            let inner = self.parse_union()?;
            return Some(TypeExpr::Rest(Box::new(inner)));
        }
        let expr = self.parse_union()?;
        if self.eat('=') {
            return Some(TypeExpr::Optional(Box::new(expr)));
        }
        Some(expr)
    }

    fn parse_union(&mut self) -> Option<TypeExpr> {
        // Leading pipe is legal in multi-line TS unions
        self.eat('|');
        let mut members = vec![self.parse_postfix()?];
        loop {
            if self.eat('|') {
                members.push(self.parse_postfix()?);
            } else if self.peek() == Some(&Token::Punct('&')) {
                return None;
            } else {
                break;
            }
        }
        if members.len() == 1 {
            members.pop()
        } else {
            Some(TypeExpr::Union(members))
        }
    }

    fn parse_postfix(&mut self) -> Option<TypeExpr> {
        let mut expr = self.parse_primary()?;
        while self.peek() == Some(&Token::Punct('[')) && self.peek_at(1) == Some(&Token::Punct(']')) {
            self.pos += 2;
            expr = TypeExpr::Array(Box::new(expr));
        }
        Some(expr)
    }

    fn parse_primary(&mut self) -> Option<TypeExpr> {
        match self.peek()?.clone() {
            Token::Punct('(') => {
                if self.looks_like_function() {
                    self.skip_function();
                    return Some(TypeExpr::Function);
                }
                self.pos += 1;
                let inner = self.parse_union()?;
                if !self.eat(')') {
                    return None;
                }
                Some(inner)
            }
            Token::Punct('[') => {
                self.pos += 1;
                let mut members = Vec::new();
                if !self.eat(']') {
                    loop {
                        members.push(self.parse_union()?);
                        if self.eat(',') {
                            continue;
                        }
                        if self.eat(']') {
                            break;
                        }
                        return None;
                    }
                }
                Some(TypeExpr::Tuple(members))
            }
            Token::Punct('{') => {
                self.skip_balanced('{', '}')?;
                Some(TypeExpr::Object)
            }
            Token::Punct('*') => {
                self.pos += 1;
                Some(TypeExpr::Named("any".to_string()))
            }
            Token::Punct('?') | Token::Punct('!') => {
                // JSDoc nullable / non-nullable markers
                self.pos += 1;
                if self.at_end() || matches!(self.peek(), Some(Token::Punct('=')) | Some(Token::Punct('|'))) {
                    return Some(TypeExpr::Named("any".to_string()));
                }
                self.parse_postfix()
            }
            Token::Str => {
                self.pos += 1;
                Some(TypeExpr::Literal(LiteralKind::String))
            }
            Token::Number => {
                self.pos += 1;
                Some(TypeExpr::Literal(LiteralKind::Number))
            }
            Token::Ident(word) => {
                self.pos += 1;
                match word.as_str() {
                    "true" | "false" => return Some(TypeExpr::Literal(LiteralKind::Boolean)),
                    "typeof" | "keyof" | "infer" | "unique" => return None,
                    "readonly" => return self.parse_postfix(),
                    _ => {}
                }
                let mut name = word;
                // Qualified names, including JSDoc `Array.<T>` spelling
                while self.peek() == Some(&Token::Punct('.')) {
                    match self.peek_at(1) {
                        Some(Token::Ident(part)) => {
                            let part = part.clone();
                            self.pos += 2;
                            name.push('.');
                            name.push_str(&part);
                        }
                        Some(Token::Punct('<')) => {
                            self.pos += 1;
                            break;
                        }
                        _ => return None,
                    }
                }
                if self.eat('<') {
                    let mut args = vec![self.parse_union()?];
                    while self.eat(',') {
                        args.push(self.parse_union()?);
                    }
                    if !self.eat('>') {
                        return None;
                    }
                    return Some(TypeExpr::Generic { name, args });
                }
                Some(TypeExpr::Named(name))
            }
            _ => None,
        }
    }

    /// Scan ahead for `( ... ) =>`
    fn looks_like_function(&self) -> bool {
        let mut depth = 0usize;
        for (offset, token) in self.tokens[self.pos..].iter().enumerate() {
            match token {
                Token::Punct('(') => depth += 1,
                Token::Punct(')') => {
                    depth -= 1;
                    if depth == 0 {
                        return self.peek_at(offset + 1) == Some(&Token::Arrow);
                    }
                }
                _ => {}
            }
        }
        false
    }

    fn skip_function(&mut self) {
        let _ = self.skip_balanced('(', ')');
        if self.peek() == Some(&Token::Arrow) {
            self.pos += 1;
            let _ = self.parse_union();
        }
    }

    fn skip_balanced(&mut self, open: char, close: char) -> Option<()> {
        let mut depth = 0usize;
        while let Some(token) = self.peek().cloned() {
            self.pos += 1;
            if token == Token::Punct(open) {
                depth += 1;
            } else if token == Token::Punct(close) {
                depth -= 1;
                if depth == 0 {
                    return Some(());
                }
            }
        }
        None
    }
}
