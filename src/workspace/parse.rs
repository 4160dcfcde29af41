//! Lexer and declaration parser for Java-like sources.
//!
//! Only the declaration skeleton is recovered: namespace declaration,
//! imports, types (nested included), fields, methods and initializers with
//! byte ranges. Method bodies and initializer expressions are skipped as
//! balanced token runs. Anything the parser cannot place marks the file as
//! structure-unknown instead of failing.

use crate::change::ImportName;
use crate::domain::{DeclarationKind, SourceRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Punct(char),
    Literal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comment {
    pub range: SourceRange,
    /// `/** ... */`
    pub doc: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
    /// False on an unterminated block comment.
    pub complete: bool,
}

const MODIFIERS: &[&str] = &[
    "public",
    "protected",
    "private",
    "static",
    "final",
    "abstract",
    "native",
    "synchronized",
    "transient",
    "volatile",
    "strictfp",
    "default",
    "sealed",
    "non",
];

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_ident_part(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

/// End of a quoted literal: after the closing quote, or at the end of the
/// line for an unterminated one.
fn scan_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut j = start + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'\n' => return j,
            b if b == quote => return j + 1,
            _ => j += 1,
        }
    }
    bytes.len()
}

pub fn lex(source: &str) -> Lexed {
    let bytes = source.as_bytes();
    let mut lexed = Lexed { complete: true, ..Lexed::default() };
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if b == b'/' && bytes.get(i + 1) == Some(&b'/') {
            let end = source[i..].find('\n').map_or(bytes.len(), |rel| i + rel);
            lexed.comments.push(Comment { range: SourceRange::from_bounds(i, end), doc: false });
            i = end;
            continue;
        }
        if b == b'/' && bytes.get(i + 1) == Some(&b'*') {
            let end = match source[i + 2..].find("*/") {
                Some(rel) => i + 2 + rel + 2,
                None => {
                    lexed.complete = false;
                    bytes.len()
                }
            };
            let doc = bytes.get(i + 2) == Some(&b'*') && bytes.get(i + 3) != Some(&b'/');
            lexed.comments.push(Comment { range: SourceRange::from_bounds(i, end), doc });
            i = end;
            continue;
        }
        if source[i..].starts_with("\"\"\"") {
            let end = source[i + 3..].find("\"\"\"").map_or(bytes.len(), |rel| i + 3 + rel + 3);
            lexed.tokens.push(Token { kind: TokenKind::Literal, start: i, end });
            i = end;
            continue;
        }
        if b == b'"' || b == b'\'' {
            let end = scan_quoted(bytes, i, b).min(bytes.len());
            lexed.tokens.push(Token { kind: TokenKind::Literal, start: i, end });
            i = end;
            continue;
        }
        if b.is_ascii_digit() {
            let mut end = i + 1;
            while end < bytes.len()
                && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_' || bytes[end] == b'.')
            {
                end += 1;
            }
            lexed.tokens.push(Token { kind: TokenKind::Literal, start: i, end });
            i = end;
            continue;
        }

        let Some(ch) = source[i..].chars().next() else { break };
        if is_ident_start(ch) {
            let mut end = i + ch.len_utf8();
            for next in source[end..].chars() {
                if !is_ident_part(next) {
                    break;
                }
                end += next.len_utf8();
            }
            lexed.tokens.push(Token { kind: TokenKind::Ident, start: i, end });
            i = end;
        } else {
            lexed.tokens.push(Token {
                kind: TokenKind::Punct(ch),
                start: i,
                end: i + ch.len_utf8(),
            });
            i += ch.len_utf8();
        }
    }

    lexed
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedNamespace {
    pub name: String,
    pub range: SourceRange,
    pub name_range: SourceRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedImport {
    pub import: ImportName,
    pub range: SourceRange,
    pub name_range: SourceRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDeclaration {
    pub kind: DeclarationKind,
    pub path: String,
    pub range: SourceRange,
    pub name_range: SourceRange,
    pub body_range: Option<SourceRange>,
    pub is_public: bool,
    pub is_static: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedUnit {
    pub namespace: Option<ParsedNamespace>,
    pub imports: Vec<ParsedImport>,
    /// Types and members in source order; a type precedes its members.
    pub declarations: Vec<ParsedDeclaration>,
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
    pub structure_known: bool,
}

impl ParsedUnit {
    /// Whether `offset` starts the name of a declared type, method or field.
    pub fn is_declaration_name(&self, offset: usize) -> bool {
        self.declarations.iter().any(|d| d.name_range.offset == offset)
    }

    pub fn declares_type(&self, simple_name: &str, source: &str) -> bool {
        self.declarations.iter().any(|d| {
            d.kind == DeclarationKind::Type
                && &source[d.name_range.offset..d.name_range.end()] == simple_name
        })
    }
}

struct ParseError;

struct Parser<'a> {
    source: &'a str,
    tokens: &'a [Token],
    comments: &'a [Comment],
    pos: usize,
    declarations: Vec<ParsedDeclaration>,
}

pub fn parse(source: &str) -> ParsedUnit {
    let lexed = lex(source);
    let mut parser = Parser {
        source,
        tokens: &lexed.tokens,
        comments: &lexed.comments,
        pos: 0,
        declarations: Vec::new(),
    };

    let mut ok = lexed.complete;
    let (namespace, imports) = match parser.parse_header() {
        Ok(header) => header,
        Err(ParseError) => {
            ok = false;
            (None, Vec::new())
        }
    };
    if ok {
        while parser.pos < parser.tokens.len() {
            if parser.at_punct(';') {
                parser.pos += 1;
                continue;
            }
            if parser.parse_member(None).is_err() {
                ok = false;
                break;
            }
        }
    }

    let declarations = parser.declarations;
    ParsedUnit {
        namespace,
        imports,
        declarations,
        tokens: lexed.tokens,
        comments: lexed.comments,
        structure_known: ok,
    }
}

impl<'a> Parser<'a> {
    fn tok(&self, idx: usize) -> Option<Token> {
        self.tokens.get(idx).copied()
    }

    fn text(&self, token: Token) -> &'a str {
        token.text(self.source)
    }

    fn at_punct(&self, c: char) -> bool {
        self.tok(self.pos).is_some_and(|t| t.is_punct(c))
    }

    fn at_word(&self, idx: usize, word: &str) -> bool {
        self.tok(idx).is_some_and(|t| t.kind == TokenKind::Ident && self.text(t) == word)
    }

    fn parse_header(&mut self) -> Result<(Option<ParsedNamespace>, Vec<ParsedImport>), ParseError> {
        let mut namespace = None;
        let mut imports = Vec::new();

        if self.at_word(self.pos, "package") {
            let start = self.tok(self.pos).ok_or(ParseError)?.start;
            self.pos += 1;
            let (name, name_range, end) = self.qualified_until_semicolon()?;
            namespace = Some(ParsedNamespace {
                name,
                range: SourceRange::from_bounds(start, end),
                name_range,
            });
        }

        while self.at_word(self.pos, "import") {
            let start = self.tok(self.pos).ok_or(ParseError)?.start;
            self.pos += 1;
            let is_static = self.at_word(self.pos, "static");
            if is_static {
                self.pos += 1;
            }
            let (name, name_range, end) = self.qualified_until_semicolon()?;
            let import = if is_static {
                ImportName::static_member(name)
            } else {
                ImportName::single(name)
            };
            imports.push(ParsedImport {
                import,
                range: SourceRange::from_bounds(start, end),
                name_range,
            });
        }

        Ok((namespace, imports))
    }

    /// `a.b.C;` or `a.b.*;`. Returns the name, its range and the end of `;`.
    fn qualified_until_semicolon(&mut self) -> Result<(String, SourceRange, usize), ParseError> {
        let mut name = String::new();
        let mut first: Option<usize> = None;
        let mut last = 0usize;
        loop {
            let token = self.tok(self.pos).ok_or(ParseError)?;
            self.pos += 1;
            match token.kind {
                TokenKind::Punct(';') => {
                    let start = first.ok_or(ParseError)?;
                    return Ok((name, SourceRange::from_bounds(start, last), token.end));
                }
                TokenKind::Ident | TokenKind::Punct('.') | TokenKind::Punct('*') => {
                    first.get_or_insert(token.start);
                    last = token.end;
                    name.push_str(self.text(token));
                }
                _ => return Err(ParseError),
            }
        }
    }

    /// Index just past the bracket that closes the one at `idx`.
    fn skip_balanced(&self, idx: usize) -> Result<usize, ParseError> {
        let mut depth = 0i32;
        let mut i = idx;
        while let Some(token) = self.tok(i) {
            match token.kind {
                TokenKind::Punct('(') | TokenKind::Punct('[') | TokenKind::Punct('{') => depth += 1,
                TokenKind::Punct(')') | TokenKind::Punct(']') | TokenKind::Punct('}') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i + 1);
                    }
                    if depth < 0 {
                        return Err(ParseError);
                    }
                }
                _ => {}
            }
            i += 1;
        }
        Err(ParseError)
    }

    /// Start of the declaration whose first token is `idx`, pulled back over
    /// an immediately preceding doc comment.
    fn declaration_start(&self, idx: usize) -> usize {
        let Some(first) = self.tok(idx) else { return self.source.len() };
        let floor = if idx == 0 { 0 } else { self.tokens[idx - 1].end };
        let preceding = self
            .comments
            .iter()
            .filter(|c| c.range.offset >= floor && c.range.end() <= first.start)
            .last();
        match preceding {
            Some(comment) if comment.doc => comment.range.offset,
            _ => first.start,
        }
    }

    fn skip_annotation(&mut self) -> Result<(), ParseError> {
        // '@' Name ('.' Name)* ('(' ... ')')?
        self.pos += 2;
        while self.at_punct('.') && self.tok(self.pos + 1).is_some_and(|t| t.kind == TokenKind::Ident)
        {
            self.pos += 2;
        }
        if self.at_punct('(') {
            self.pos = self.skip_balanced(self.pos)?;
        }
        Ok(())
    }

    fn parse_member(&mut self, parent: Option<&str>) -> Result<(), ParseError> {
        let first_idx = self.pos;
        let mut is_public = false;
        let mut is_static = false;

        loop {
            let Some(token) = self.tok(self.pos) else { return Err(ParseError) };
            match token.kind {
                TokenKind::Ident if MODIFIERS.contains(&self.text(token)) => {
                    match self.text(token) {
                        "public" => is_public = true,
                        "static" => is_static = true,
                        // non-sealed
                        "non" if self.tok(self.pos + 1).is_some_and(|t| t.is_punct('-')) => {
                            self.pos += 2;
                        }
                        _ => {}
                    }
                    self.pos += 1;
                }
                TokenKind::Punct('@')
                    if self.tok(self.pos + 1).is_some_and(|t| t.kind == TokenKind::Ident)
                        && !self.at_word(self.pos + 1, "interface") =>
                {
                    self.skip_annotation()?;
                }
                _ => break,
            }
        }

        let start = self.declaration_start(first_idx);
        let token = self.tok(self.pos).ok_or(ParseError)?;

        let is_type_keyword = matches!(self.text(token), "class" | "interface" | "enum" | "record")
            && token.kind == TokenKind::Ident;
        let is_annotation_type = token.is_punct('@') && self.at_word(self.pos + 1, "interface");
        if is_type_keyword || is_annotation_type {
            return self.parse_type(parent, start, is_public, is_static);
        }

        let Some(parent) = parent else { return Err(ParseError) };

        if token.is_punct('{') {
            let end_idx = self.skip_balanced(self.pos)?;
            let end = self.tokens[end_idx - 1].end;
            self.declarations.push(ParsedDeclaration {
                kind: DeclarationKind::Initializer,
                path: format!("{parent}.initializer"),
                range: SourceRange::from_bounds(start, end),
                name_range: SourceRange::new(token.start, 0),
                body_range: Some(SourceRange::from_bounds(token.start, end)),
                is_public,
                is_static,
            });
            self.pos = end_idx;
            return Ok(());
        }

        self.parse_field_or_method(parent, start, is_public, is_static)
    }

    fn parse_type(
        &mut self,
        parent: Option<&str>,
        start: usize,
        is_public: bool,
        is_static: bool,
    ) -> Result<(), ParseError> {
        let keyword_token = self.tok(self.pos).ok_or(ParseError)?;
        let is_enum = self.text(keyword_token) == "enum";
        self.pos += if keyword_token.is_punct('@') { 2 } else { 1 };

        let name_token = self.tok(self.pos).ok_or(ParseError)?;
        if name_token.kind != TokenKind::Ident {
            return Err(ParseError);
        }
        let name = self.text(name_token);
        let path = match parent {
            Some(parent) => format!("{parent}.{name}"),
            None => name.to_string(),
        };
        self.pos += 1;

        while !self.at_punct('{') {
            let token = self.tok(self.pos).ok_or(ParseError)?;
            if token.is_punct('(') {
                self.pos = self.skip_balanced(self.pos)?;
            } else if token.is_punct(';') || token.is_punct('}') {
                return Err(ParseError);
            } else {
                self.pos += 1;
            }
        }

        let body_start = self.tok(self.pos).ok_or(ParseError)?.start;
        let index = self.declarations.len();
        self.declarations.push(ParsedDeclaration {
            kind: DeclarationKind::Type,
            path: path.clone(),
            range: SourceRange::from_bounds(start, body_start),
            name_range: SourceRange::from_bounds(name_token.start, name_token.end),
            body_range: None,
            is_public,
            is_static,
        });
        self.pos += 1;

        if is_enum {
            self.parse_enum_constants(&path)?;
        }

        let body_end = loop {
            let token = self.tok(self.pos).ok_or(ParseError)?;
            if token.is_punct('}') {
                self.pos += 1;
                break token.end;
            }
            if token.is_punct(';') {
                self.pos += 1;
                continue;
            }
            self.parse_member(Some(&path))?;
        };

        let decl = &mut self.declarations[index];
        decl.range = SourceRange::from_bounds(start, body_end);
        decl.body_range = Some(SourceRange::from_bounds(body_start, body_end));
        Ok(())
    }

    fn parse_enum_constants(&mut self, path: &str) -> Result<(), ParseError> {
        loop {
            let token = self.tok(self.pos).ok_or(ParseError)?;
            if token.is_punct('}') {
                return Ok(());
            }
            if token.is_punct(';') {
                self.pos += 1;
                return Ok(());
            }
            let first_idx = self.pos;
            while self.at_punct('@') {
                self.skip_annotation()?;
            }
            let start = self.declaration_start(first_idx);
            let name_token = self.tok(self.pos).ok_or(ParseError)?;
            if name_token.kind != TokenKind::Ident {
                return Err(ParseError);
            }
            self.pos += 1;
            let mut end = name_token.end;
            if self.at_punct('(') {
                self.pos = self.skip_balanced(self.pos)?;
                end = self.tokens[self.pos - 1].end;
            }
            if self.at_punct('{') {
                self.pos = self.skip_balanced(self.pos)?;
                end = self.tokens[self.pos - 1].end;
            }
            self.declarations.push(ParsedDeclaration {
                kind: DeclarationKind::Field,
                path: format!("{path}.{}", self.text(name_token)),
                range: SourceRange::from_bounds(start, end),
                name_range: SourceRange::from_bounds(name_token.start, name_token.end),
                body_range: None,
                is_public: true,
                is_static: true,
            });
            if self.at_punct(',') {
                self.pos += 1;
            }
        }
    }

    fn parse_field_or_method(
        &mut self,
        parent: &str,
        start: usize,
        is_public: bool,
        is_static: bool,
    ) -> Result<(), ParseError> {
        let mut seen_eq = false;
        let mut last_ident: Option<Token> = None;
        let mut name_token: Option<Token> = None;

        loop {
            let token = self.tok(self.pos).ok_or(ParseError)?;
            match token.kind {
                TokenKind::Ident => {
                    if !seen_eq && name_token.is_none() {
                        last_ident = Some(token);
                    }
                    self.pos += 1;
                }
                TokenKind::Punct('=') if !seen_eq => {
                    seen_eq = true;
                    if name_token.is_none() {
                        name_token = last_ident;
                    }
                    self.pos += 1;
                }
                TokenKind::Punct(',') => {
                    if !seen_eq && name_token.is_none() {
                        name_token = last_ident;
                    }
                    self.pos += 1;
                }
                TokenKind::Punct('(') if !seen_eq && name_token.is_none() => {
                    let name = last_ident.ok_or(ParseError)?;
                    self.pos = self.skip_balanced(self.pos)?;
                    return self.finish_method(parent, start, name, is_public, is_static);
                }
                TokenKind::Punct('(') | TokenKind::Punct('[') | TokenKind::Punct('{') => {
                    if token.is_punct('{') && !seen_eq {
                        return Err(ParseError);
                    }
                    self.pos = self.skip_balanced(self.pos)?;
                }
                TokenKind::Punct(';') => {
                    let name = name_token.or(last_ident).ok_or(ParseError)?;
                    self.declarations.push(ParsedDeclaration {
                        kind: DeclarationKind::Field,
                        path: format!("{parent}.{}", self.text(name)),
                        range: SourceRange::from_bounds(start, token.end),
                        name_range: SourceRange::from_bounds(name.start, name.end),
                        body_range: None,
                        is_public,
                        is_static,
                    });
                    self.pos += 1;
                    return Ok(());
                }
                TokenKind::Punct('}') | TokenKind::Punct(')') | TokenKind::Punct(']') => {
                    return Err(ParseError);
                }
                _ => self.pos += 1,
            }
        }
    }

    fn finish_method(
        &mut self,
        parent: &str,
        start: usize,
        name: Token,
        is_public: bool,
        is_static: bool,
    ) -> Result<(), ParseError> {
        loop {
            let token = self.tok(self.pos).ok_or(ParseError)?;
            if token.is_punct('{') {
                let end_idx = self.skip_balanced(self.pos)?;
                let end = self.tokens[end_idx - 1].end;
                self.declarations.push(ParsedDeclaration {
                    kind: DeclarationKind::Method,
                    path: format!("{parent}.{}", self.text(name)),
                    range: SourceRange::from_bounds(start, end),
                    name_range: SourceRange::from_bounds(name.start, name.end),
                    body_range: Some(SourceRange::from_bounds(token.start, end)),
                    is_public,
                    is_static,
                });
                self.pos = end_idx;
                return Ok(());
            }
            if token.is_punct(';') {
                self.declarations.push(ParsedDeclaration {
                    kind: DeclarationKind::Method,
                    path: format!("{parent}.{}", self.text(name)),
                    range: SourceRange::from_bounds(start, token.end),
                    name_range: SourceRange::from_bounds(name.start, name.end),
                    body_range: None,
                    is_public,
                    is_static,
                });
                self.pos += 1;
                return Ok(());
            }
            if token.is_punct('(') {
                self.pos = self.skip_balanced(self.pos)?;
            } else if token.is_punct('}') {
                return Err(ParseError);
            } else {
                self.pos += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOO: &str = "package pkg.a;

import java.util.List;
import static pkg.b.Util.helper;

/** The foo. */
public class Foo {
    /** Counter. */
    private int x = 0;
    static { init(); }
    @Override
    public String toString() { return \"Foo{\" + x + \"}\"; }
    public Foo(int a) { this.x = a; }
    public Foo() { this(1); }
    enum Kind { A, B(2) { }, C; int weight; }
    Runnable r = () -> { run(); };
}

class Helper {}
";

    fn paths(unit: &ParsedUnit) -> Vec<(DeclarationKind, String)> {
        unit.declarations.iter().map(|d| (d.kind, d.path.clone())).collect()
    }

    #[test]
    fn parses_header() {
        let unit = parse(FOO);
        assert!(unit.structure_known);
        let ns = unit.namespace.as_ref().expect("package");
        assert_eq!(ns.name, "pkg.a");
        assert_eq!(&FOO[ns.name_range.offset..ns.name_range.end()], "pkg.a");
        assert_eq!(&FOO[ns.range.offset..ns.range.end()], "package pkg.a;");
        assert_eq!(unit.imports.len(), 2);
        assert_eq!(unit.imports[1].import, ImportName::static_member("pkg.b.Util.helper"));
    }

    #[test]
    fn parses_members_in_source_order() {
        let unit = parse(FOO);
        assert_eq!(
            paths(&unit),
            vec![
                (DeclarationKind::Type, "Foo".to_string()),
                (DeclarationKind::Field, "Foo.x".to_string()),
                (DeclarationKind::Initializer, "Foo.initializer".to_string()),
                (DeclarationKind::Method, "Foo.toString".to_string()),
                (DeclarationKind::Method, "Foo.Foo".to_string()),
                (DeclarationKind::Method, "Foo.Foo".to_string()),
                (DeclarationKind::Type, "Foo.Kind".to_string()),
                (DeclarationKind::Field, "Foo.Kind.A".to_string()),
                (DeclarationKind::Field, "Foo.Kind.B".to_string()),
                (DeclarationKind::Field, "Foo.Kind.C".to_string()),
                (DeclarationKind::Field, "Foo.Kind.weight".to_string()),
                (DeclarationKind::Field, "Foo.r".to_string()),
                (DeclarationKind::Type, "Helper".to_string()),
            ]
        );
    }

    #[test]
    fn ranges_include_doc_comments() {
        let unit = parse(FOO);
        let foo = &unit.declarations[0];
        assert!(FOO[foo.range.offset..].starts_with("/** The foo. */\npublic class Foo"));
        assert!(foo.is_public);
        let x = &unit.declarations[1];
        assert_eq!(&FOO[x.range.offset..x.range.end()], "/** Counter. */\n    private int x = 0;");
        let to_string = &unit.declarations[3];
        assert!(FOO[to_string.range.offset..].starts_with("@Override"));
    }

    #[test]
    fn unbalanced_input_is_structure_unknown() {
        let unit = parse("package p;\nclass A {\n  void f() {\n");
        assert!(!unit.structure_known);
        let unit = parse("package p;\nclass A {}\n/* open");
        assert!(!unit.structure_known);
    }

    #[test]
    fn lexer_skips_strings_and_comments() {
        let lexed = lex("a /* b */ \"c // d\" // e\n'f' g");
        let idents: Vec<&str> = lexed
            .tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Ident)
            .map(|t| t.text("a /* b */ \"c // d\" // e\n'f' g"))
            .collect();
        assert_eq!(idents, vec!["a", "g"]);
        assert_eq!(lexed.comments.len(), 2);
    }

    #[test]
    fn records_and_interfaces() {
        let unit = parse("package p;\npublic record R(int a, String b) implements I { }\ninterface I { void m(); int K = 1; }\n");
        assert!(unit.structure_known);
        assert_eq!(
            paths(&unit),
            vec![
                (DeclarationKind::Type, "R".to_string()),
                (DeclarationKind::Type, "I".to_string()),
                (DeclarationKind::Method, "I.m".to_string()),
                (DeclarationKind::Field, "I.K".to_string()),
            ]
        );
    }
}
