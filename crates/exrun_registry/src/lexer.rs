//! Lexer for scenario lists
//!
//! Handles tokenization including:
//! - Identifiers (category names, bare conditions such as `True` or `options.valgrind`)
//! - Single- and double-quoted strings with `\\`, `\n`, `\t` and quote escapes
//! - Punctuation: `=`, `[`, `]`, `(`, `)`, `,`
//! - `#` comments to end of line
//!
//! Whitespace and newlines carry no meaning. Errors are collected rather than returned eagerly so a
//! single pass reports every bad character.

use crate::diagnostics::{Problem, ProblemKind, Span};

/// Kind of token produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    Str(String),
    Equals,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Eof,
}

impl TokenKind {
    /// Human-readable description for "expected X, found Y" diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier `{}`", name),
            TokenKind::Str(value) => format!("string \"{}\"", value),
            TokenKind::Equals => "`=`".to_string(),
            TokenKind::LBracket => "`[`".to_string(),
            TokenKind::RBracket => "`]`".to_string(),
            TokenKind::LParen => "`(`".to_string(),
            TokenKind::RParen => "`)`".to_string(),
            TokenKind::Comma => "`,`".to_string(),
            TokenKind::Eof => "end of file".to_string(),
        }
    }
}

/// A token with its kind and source span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Lexer for scenario-list source text.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
    tokens: Vec<Token>,
    problems: Vec<Problem>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.char_indices().peekable(),
            current_pos: 0,
            tokens: Vec::new(),
            problems: Vec::new(),
        }
    }

    /// Tokenize the entire source.
    ///
    /// The token stream always ends with an `Eof` token, even when problems were found, so the
    /// parser can keep going and report its own errors alongside the lexical ones.
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<Problem>) {
        while let Some(c) = self.advance() {
            let start = self.current_pos - c.len_utf8();
            match c {
                c if c.is_whitespace() => {}
                '#' => self.skip_comment(),
                '=' => self.push(TokenKind::Equals, start),
                '[' => self.push(TokenKind::LBracket, start),
                ']' => self.push(TokenKind::RBracket, start),
                '(' => self.push(TokenKind::LParen, start),
                ')' => self.push(TokenKind::RParen, start),
                ',' => self.push(TokenKind::Comma, start),
                '"' | '\'' => self.scan_string(c, start),
                c if is_ident_start(c) => self.scan_ident(c, start),
                other => self
                    .problems
                    .push(Problem::new(ProblemKind::UnexpectedChar(other), Span::new(start, self.current_pos))),
            }
        }

        self.tokens
            .push(Token::new(TokenKind::Eof, Span::new(self.current_pos, self.current_pos)));
        (self.tokens, self.problems)
    }

    // ========================================================================
    // Core character handling
    // ========================================================================

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn advance(&mut self) -> Option<char> {
        if let Some((pos, c)) = self.chars.next() {
            self.current_pos = pos + c.len_utf8();
            Some(c)
        } else {
            None
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token::new(kind, Span::new(start, self.current_pos)));
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    // ========================================================================
    // Literals
    // ========================================================================

    fn scan_ident(&mut self, first: char, start: usize) {
        let mut name = String::from(first);
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        self.push(TokenKind::Ident(name), start);
    }

    fn scan_string(&mut self, quote: char, start: usize) {
        let mut value = String::new();
        loop {
            match self.advance() {
                Some(c) if c == quote => {
                    self.push(TokenKind::Str(value), start);
                    return;
                }
                // Strings never span lines
                Some('\n') | None => {
                    self.problems.push(Problem::new(
                        ProblemKind::UnterminatedString,
                        Span::new(start, self.current_pos),
                    ));
                    return;
                }
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('\\') => value.push('\\'),
                    Some(q) if q == quote => value.push(q),
                    // Unknown escape - preserve as-is
                    Some(other) => {
                        value.push('\\');
                        value.push(other);
                    }
                    None => {
                        self.problems.push(Problem::new(
                            ProblemKind::UnterminatedString,
                            Span::new(start, self.current_pos),
                        ));
                        return;
                    }
                },
                Some(c) => value.push(c),
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Tokenize scenario-list source text.
pub fn lex(source: &str) -> (Vec<Token>, Vec<Problem>) {
    Lexer::new(source).tokenize()
}
