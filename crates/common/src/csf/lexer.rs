// Tokenizer for JavaScript/TypeScript story modules.
//
// Produces just enough structure to find top-level statements and object
// literal entries: identifiers, literals, and punctuation with byte spans.
// Comments and whitespace are skipped; brackets are checked for balance.
// A JSX element in expression position is one opaque token, so its text
// children may hold apostrophes and stray punctuation.

use super::{line_at, CsfError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Str,
    Template,
    Regex,
    Jsx,
    Punct,
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

    pub fn is_punct(&self, source: &str, punct: &str) -> bool {
        self.kind == TokenKind::Punct && self.text(source) == punct
    }

    pub fn is_ident(&self, source: &str, word: &str) -> bool {
        self.kind == TokenKind::Ident && self.text(source) == word
    }
}

/// Longest-first so `===` wins over `==` and `=`.
const MULTI_CHAR_PUNCT: &[&str] = &[
    "...", "===", "!==", "**=", "<<=", "??=", "&&=", "||=", "=>", "==", "!=", "<=", ">=", "&&",
    "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "**", "<<",
];

/// Keywords after which a `<` opens a JSX element.
const JSX_PREFIX_KEYWORDS: &[&str] = &["return", "default", "yield", "await", "case"];

/// Punctuation after which a `<` opens a JSX element rather than a comparison.
const JSX_PREFIX_PUNCT: &[&str] =
    &["(", "[", "{", ",", ":", "=", "=>", "?", "&&", "||", "??", "!", ";"];

/// Keywords after which a `/` starts a regular expression rather than a division.
const REGEX_PREFIX_KEYWORDS: &[&str] = &[
    "return", "typeof", "case", "do", "else", "in", "of", "new", "delete", "void", "throw",
    "instanceof", "yield", "await",
];

pub fn tokenize(source: &str) -> Result<Vec<Token>, CsfError> {
    Lexer::at(source, 0).run()
}

pub fn is_ident_start(ch: char) -> bool {
    ch == '$' || ch == '_' || unicode_ident::is_xid_start(ch)
}

pub fn is_ident_continue(ch: char) -> bool {
    ch == '$' || ch == '\u{200c}' || ch == '\u{200d}' || unicode_ident::is_xid_continue(ch)
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    tokens: Vec<Token>,
    brackets: Vec<(char, usize)>,
}

impl<'a> Lexer<'a> {
    fn at(source: &'a str, pos: usize) -> Self {
        Self { source, pos, tokens: Vec::new(), brackets: Vec::new() }
    }

    fn run(mut self) -> Result<Vec<Token>, CsfError> {
        self.scan_tokens(false)?;
        if let Some((open, offset)) = self.brackets.pop() {
            return Err(CsfError::Unbalanced { delimiter: open, line: line_at(self.source, offset) });
        }
        Ok(self.tokens)
    }

    /// Tokenize until end of input, or with `stop_at_brace` until the `}`
    /// closing an already-open expression container. Returns whether that
    /// brace was consumed.
    fn scan_tokens(&mut self, stop_at_brace: bool) -> Result<bool, CsfError> {
        while let Some(ch) = self.peek() {
            let start = self.pos;

            if ch.is_whitespace() {
                self.bump(ch);
                continue;
            }
            if self.rest().starts_with("//") {
                self.skip_line_comment();
                continue;
            }
            if self.rest().starts_with("/*") {
                self.skip_block_comment()?;
                continue;
            }

            match ch {
                '\'' | '"' => {
                    self.scan_string(ch)?;
                    self.push(TokenKind::Str, start);
                }
                '`' => {
                    self.scan_template()?;
                    self.push(TokenKind::Template, start);
                }
                '/' if self.regex_allowed() => {
                    self.scan_regex()?;
                    self.push(TokenKind::Regex, start);
                }
                c if is_ident_start(c) => {
                    self.bump_while(is_ident_continue);
                    self.push(TokenKind::Ident, start);
                }
                c if c.is_ascii_digit() || (c == '.' && self.peek_nth(1).is_some_and(|n| n.is_ascii_digit())) => {
                    self.bump_while(|n| n.is_ascii_alphanumeric() || n == '_' || n == '.');
                    self.push(TokenKind::Number, start);
                }
                '}' if stop_at_brace && self.brackets.is_empty() => {
                    self.bump(ch);
                    return Ok(true);
                }
                '<' if self.jsx_allowed() => {
                    if self.scan_jsx_element() {
                        self.push(TokenKind::Jsx, start);
                    } else {
                        self.pos = start;
                        self.scan_punct(ch)?;
                    }
                }
                _ => self.scan_punct(ch)?,
            }
        }
        Ok(false)
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self, ch: char) {
        self.pos += ch.len_utf8();
    }

    fn bump_while(&mut self, predicate: impl Fn(char) -> bool) {
        while let Some(ch) = self.peek() {
            if !predicate(ch) {
                break;
            }
            self.bump(ch);
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token { kind, start, end: self.pos });
    }

    fn unterminated(&self, what: &'static str, start: usize) -> CsfError {
        CsfError::Unterminated { what, line: line_at(self.source, start) }
    }

    fn skip_line_comment(&mut self) {
        match self.rest().find('\n') {
            Some(offset) => self.pos += offset,
            None => self.pos = self.source.len(),
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), CsfError> {
        let start = self.pos;
        match self.source[start + 2..].find("*/") {
            Some(offset) => {
                self.pos = start + 2 + offset + 2;
                Ok(())
            }
            None => Err(self.unterminated("block comment", start)),
        }
    }

    fn scan_string(&mut self, quote: char) -> Result<(), CsfError> {
        let start = self.pos;
        self.bump(quote);
        loop {
            match self.peek() {
                None | Some('\n') => return Err(self.unterminated("string literal", start)),
                Some('\\') => {
                    self.bump('\\');
                    if let Some(escaped) = self.peek() {
                        self.bump(escaped);
                    }
                }
                Some(ch) if ch == quote => {
                    self.bump(ch);
                    return Ok(());
                }
                Some(ch) => self.bump(ch),
            }
        }
    }

    fn scan_template(&mut self) -> Result<(), CsfError> {
        let start = self.pos;
        self.bump('`');
        loop {
            match self.peek() {
                None => return Err(self.unterminated("template literal", start)),
                Some('\\') => {
                    self.bump('\\');
                    if let Some(escaped) = self.peek() {
                        self.bump(escaped);
                    }
                }
                Some('`') => {
                    self.bump('`');
                    return Ok(());
                }
                Some('$') if self.peek_nth(1) == Some('{') => {
                    self.pos += 2;
                    self.skip_template_expression(start)?;
                }
                Some(ch) => self.bump(ch),
            }
        }
    }

    /// Skip a `${ ... }` substitution, including nested literals and braces.
    fn skip_template_expression(&mut self, template_start: usize) -> Result<(), CsfError> {
        let mut depth = 0usize;
        loop {
            let Some(ch) = self.peek() else {
                return Err(self.unterminated("template literal", template_start));
            };
            if self.rest().starts_with("//") {
                self.skip_line_comment();
                continue;
            }
            if self.rest().starts_with("/*") {
                self.skip_block_comment()?;
                continue;
            }
            match ch {
                '\'' | '"' => self.scan_string(ch)?,
                '`' => self.scan_template()?,
                '{' => {
                    depth += 1;
                    self.bump(ch);
                }
                '}' if depth == 0 => {
                    self.bump(ch);
                    return Ok(());
                }
                '}' => {
                    depth -= 1;
                    self.bump(ch);
                }
                _ => self.bump(ch),
            }
        }
    }

    fn regex_allowed(&self) -> bool {
        let Some(previous) = self.tokens.last() else {
            return true;
        };
        let text = previous.text(self.source);
        match previous.kind {
            // `</tag>` closes a JSX element; it is never a regex.
            TokenKind::Punct => !matches!(text, ")" | "]" | "}" | "<"),
            TokenKind::Ident => REGEX_PREFIX_KEYWORDS.contains(&text),
            TokenKind::Number
            | TokenKind::Str
            | TokenKind::Template
            | TokenKind::Regex
            | TokenKind::Jsx => false,
        }
    }

    fn jsx_allowed(&self) -> bool {
        let next = self.peek_nth(1);
        if !next.is_some_and(|ch| ch == '>' || is_ident_start(ch)) {
            return false;
        }
        let Some(previous) = self.tokens.last() else {
            return true;
        };
        let text = previous.text(self.source);
        match previous.kind {
            TokenKind::Punct => JSX_PREFIX_PUNCT.contains(&text),
            TokenKind::Ident => JSX_PREFIX_KEYWORDS.contains(&text),
            _ => false,
        }
    }

    /// Scan one JSX element or fragment starting at `<`. Returns false when
    /// the text is not well-formed JSX (a type argument list such as
    /// `<T,>(x: T) => x`); the caller rewinds and lexes `<` as punctuation.
    fn scan_jsx_element(&mut self) -> bool {
        self.bump('<');
        if self.peek() == Some('>') {
            self.bump('>');
            return self.scan_jsx_children("");
        }
        let name_start = self.pos;
        self.bump_while(is_jsx_name_char);
        let name_end = self.pos;

        loop {
            self.bump_while(char::is_whitespace);
            match self.peek() {
                Some('/') if self.peek_nth(1) == Some('>') => {
                    self.pos += 2;
                    return true;
                }
                Some('>') => {
                    self.bump('>');
                    let source = self.source;
                    return self.scan_jsx_children(&source[name_start..name_end]);
                }
                Some('{') => {
                    if !self.skip_jsx_expression() {
                        return false;
                    }
                }
                Some(ch) if is_ident_start(ch) => {
                    self.bump_while(is_jsx_name_char);
                    self.bump_while(char::is_whitespace);
                    if self.peek() == Some('=') {
                        self.bump('=');
                        self.bump_while(char::is_whitespace);
                        if !self.scan_jsx_attribute_value() {
                            return false;
                        }
                    }
                }
                _ => return false,
            }
        }
    }

    fn scan_jsx_attribute_value(&mut self) -> bool {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump(quote);
                match self.rest().find(quote) {
                    Some(offset) => {
                        self.pos += offset + 1;
                        true
                    }
                    None => false,
                }
            }
            Some('{') => self.skip_jsx_expression(),
            Some('<') => self.scan_jsx_element(),
            _ => false,
        }
    }

    /// Children up to and including the closing tag of `name`.
    fn scan_jsx_children(&mut self, name: &str) -> bool {
        loop {
            match self.peek() {
                None => return false,
                Some('{') => {
                    if !self.skip_jsx_expression() {
                        return false;
                    }
                }
                Some('<') if self.peek_nth(1) == Some('/') => {
                    self.pos += 2;
                    self.bump_while(char::is_whitespace);
                    let close_start = self.pos;
                    self.bump_while(is_jsx_name_char);
                    let closes = &self.source[close_start..self.pos] == name;
                    self.bump_while(char::is_whitespace);
                    if !closes || self.peek() != Some('>') {
                        return false;
                    }
                    self.bump('>');
                    return true;
                }
                Some('<') => {
                    if !self.scan_jsx_element() {
                        return false;
                    }
                }
                Some(ch) => self.bump(ch),
            }
        }
    }

    /// Skip a `{ ... }` expression container, lexing its contents as code.
    fn skip_jsx_expression(&mut self) -> bool {
        let mut inner = Lexer::at(self.source, self.pos + 1);
        match inner.scan_tokens(true) {
            Ok(true) => {
                self.pos = inner.pos;
                true
            }
            _ => false,
        }
    }

    fn scan_regex(&mut self) -> Result<(), CsfError> {
        let start = self.pos;
        self.bump('/');
        let mut in_class = false;
        loop {
            match self.peek() {
                None | Some('\n') => return Err(self.unterminated("regular expression", start)),
                Some('\\') => {
                    self.bump('\\');
                    if let Some(escaped) = self.peek() {
                        self.bump(escaped);
                    }
                }
                Some('[') => {
                    in_class = true;
                    self.bump('[');
                }
                Some(']') => {
                    in_class = false;
                    self.bump(']');
                }
                Some('/') if !in_class => {
                    self.bump('/');
                    self.bump_while(is_ident_continue);
                    return Ok(());
                }
                Some(ch) => self.bump(ch),
            }
        }
    }

    fn scan_punct(&mut self, ch: char) -> Result<(), CsfError> {
        let start = self.pos;
        match ch {
            '(' | '[' | '{' => self.brackets.push((ch, start)),
            ')' | ']' | '}' => {
                let expected = match ch {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match self.brackets.pop() {
                    Some((open, _)) if open == expected => {}
                    _ => {
                        return Err(CsfError::Unbalanced {
                            delimiter: ch,
                            line: line_at(self.source, start),
                        })
                    }
                }
            }
            _ => {}
        }

        let len = MULTI_CHAR_PUNCT
            .iter()
            .find(|punct| self.rest().starts_with(**punct))
            .map(|punct| punct.len())
            .unwrap_or_else(|| ch.len_utf8());
        self.pos += len;
        self.push(TokenKind::Punct, start);
        Ok(())
    }
}

fn is_jsx_name_char(ch: char) -> bool {
    ch == '-' || ch == '.' || ch == ':' || is_ident_continue(ch)
}

/// Index of the token closing the bracket opened at `open`.
pub fn matching_close(tokens: &[Token], source: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, token) in tokens.iter().enumerate().skip(open) {
        if token.kind != TokenKind::Punct {
            continue;
        }
        match token.text(source) {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

/// Bracket depth change contributed by a token.
pub fn depth_delta(token: &Token, source: &str) -> isize {
    if token.kind != TokenKind::Punct {
        return 0;
    }
    match token.text(source) {
        "(" | "[" | "{" => 1,
        ")" | "]" | "}" => -1,
        _ => 0,
    }
}
