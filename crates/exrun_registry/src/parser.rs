//! Parser for scenario lists.
//!
//! Grammar (whitespace and comments already stripped by the lexer):
//!
//! ```text
//! file       := assignment*
//! assignment := IDENT "=" "[" (entry ("," entry)* ","?)? "]"
//! entry      := "(" field ("," field)* ","? ")"
//! field      := STRING | IDENT
//! ```
//!
//! The parser recovers at entry and assignment boundaries so one pass reports every problem in
//! the file. Converting fields into [`Scenario`] values (category, arity, condition vocabulary,
//! non-empty invocation) happens here as well, since every one of those checks needs a span.

use crate::diagnostics::{Problem, ProblemKind, Span};
use crate::lexer::{Token, TokenKind};
use crate::scenario::{Category, Condition, Invocation, Scenario, ScenarioId};

/// A parsed field of an entry tuple.
#[derive(Debug, Clone)]
struct Field {
    text: String,
    span: Span,
}

/// Entries of one category in file order; ids are assigned later in registry order.
#[derive(Debug, Default)]
pub struct ParsedList {
    pub native: Vec<Scenario>,
    pub scripted: Vec<Scenario>,
}

static EOF: Token = Token {
    kind: TokenKind::Eof,
    span: Span { start: 0, end: 0 },
};

/// Parser state.
pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    problems: Vec<Problem>,
    seen: Vec<Category>,
}

impl<'a> Parser<'a> {
    /// Create a parser over a token stream, normally ending in `Eof`.
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            problems: Vec::new(),
            seen: Vec::new(),
        }
    }

    /// Parse every assignment in the token stream.
    ///
    /// Returns the scenarios that parsed cleanly together with every problem encountered; the
    /// caller decides that any problem invalidates the whole list.
    pub fn parse(mut self) -> (ParsedList, Vec<Problem>) {
        let mut list = ParsedList::default();

        while !self.is_at_end() {
            if let Err(problem) = self.assignment(&mut list) {
                self.problems.push(problem);
                self.synchronize_assignment();
            }
        }

        (list, self.problems)
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn peek(&self) -> &Token {
        // Reading past the slice behaves like a trailing Eof, so an empty stream is an empty file
        self.tokens.get(self.pos).unwrap_or(&EOF)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> &Token {
        let idx = self.pos;
        if !self.is_at_end() {
            self.pos += 1;
        }
        self.tokens.get(idx).unwrap_or(&EOF)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<Span, Problem> {
        if self.check(&kind) {
            Ok(self.advance().span)
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &'static str) -> Problem {
        let token = self.peek();
        Problem::new(
            ProblemKind::Expected {
                expected,
                found: token.kind.describe(),
            },
            token.span,
        )
    }

    /// Skip to the next `IDENT =` pair (the start of an assignment) or end of file.
    fn synchronize_assignment(&mut self) {
        while !self.is_at_end() {
            let at_ident = matches!(self.peek().kind, TokenKind::Ident(_));
            let next_is_eq = self
                .tokens
                .get(self.pos + 1)
                .is_some_and(|t| t.kind == TokenKind::Equals);
            if at_ident && next_is_eq {
                return;
            }
            self.advance();
        }
    }

    /// Skip past the current entry: up to and including `)`, or up to `]`/EOF.
    fn synchronize_entry(&mut self) {
        while !self.is_at_end() {
            match self.peek().kind {
                TokenKind::RParen => {
                    self.advance();
                    return;
                }
                TokenKind::RBracket => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ========================================================================
    // Grammar
    // ========================================================================

    fn assignment(&mut self, list: &mut ParsedList) -> Result<(), Problem> {
        let token = self.peek().clone();
        let TokenKind::Ident(name) = token.kind else {
            return Err(self.unexpected("a category name"));
        };
        self.advance();

        let category = Category::from_list_name(&name);
        if category.is_none() {
            self.problems.push(
                Problem::new(ProblemKind::UnknownCategory(name.clone()), token.span)
                    .with_help("expected `native_examples` or `scripted_examples`"),
            );
        }
        if let Some(cat) = category {
            if self.seen.contains(&cat) {
                self.problems
                    .push(Problem::new(ProblemKind::DuplicateCategory(name.clone()), token.span));
            }
            self.seen.push(cat);
        }

        self.expect(TokenKind::Equals, "`=`")?;
        self.expect(TokenKind::LBracket, "`[`")?;

        loop {
            if self.check(&TokenKind::RBracket) {
                self.advance();
                return Ok(());
            }
            if self.is_at_end() {
                return Err(self.unexpected("`]`"));
            }

            match self.entry() {
                Ok(fields) => {
                    if let Some(cat) = category {
                        match build_scenario(cat, fields) {
                            Ok(scenario) => match cat {
                                Category::Native => list.native.push(scenario),
                                Category::Scripted => list.scripted.push(scenario),
                            },
                            Err(problems) => self.problems.extend(problems),
                        }
                    }
                }
                Err(problem) => {
                    self.problems.push(problem);
                    self.synchronize_entry();
                    if self.is_at_end() {
                        // Already reported; a missing `]` here would point at the same spot
                        return Ok(());
                    }
                }
            }

            if self.check(&TokenKind::Comma) {
                self.advance();
            } else if !self.check(&TokenKind::RBracket) {
                return Err(self.unexpected("`,` or `]`"));
            }
        }
    }

    fn entry(&mut self) -> Result<(Vec<Field>, Span), Problem> {
        let open = self.expect(TokenKind::LParen, "`(`")?;
        let mut fields = Vec::new();

        loop {
            if self.check(&TokenKind::RParen) {
                let close = self.advance().span;
                return Ok((fields, open.merge(close)));
            }

            let token = self.peek().clone();
            match token.kind {
                TokenKind::Str(text) | TokenKind::Ident(text) => {
                    self.advance();
                    fields.push(Field { text, span: token.span });
                }
                _ => return Err(self.unexpected("a string")),
            }

            if self.check(&TokenKind::Comma) {
                self.advance();
            } else if !self.check(&TokenKind::RParen) {
                return Err(self.unexpected("`,` or `)`"));
            }
        }
    }
}

/// Turn the fields of one entry into a scenario, checking arity and vocabulary.
fn build_scenario(category: Category, (fields, span): (Vec<Field>, Span)) -> Result<Scenario, Vec<Problem>> {
    let arity_ok = match category {
        Category::Native => fields.len() == 3,
        Category::Scripted => fields.len() == 2 || fields.len() == 3,
    };
    if !arity_ok {
        let expected = match category {
            Category::Native => "3",
            Category::Scripted => "2 or 3",
        };
        return Err(vec![Problem::new(
            ProblemKind::Arity {
                category: category.as_str(),
                expected,
                found: fields.len(),
            },
            span,
        )]);
    }

    let mut problems = Vec::new();

    let invocation = Invocation::new(fields[0].text.clone());
    if invocation.is_none() {
        problems.push(Problem::new(ProblemKind::EmptyInvocation, fields[0].span));
    }

    let run_condition = condition(&fields[1], &mut problems);
    let checker_condition = match fields.get(2) {
        Some(field) => condition(field, &mut problems),
        None => Some(Condition::Never),
    };

    match (invocation, run_condition, checker_condition) {
        (Some(invocation), Some(run_condition), Some(checker_condition)) if problems.is_empty() => Ok(Scenario {
            // Placeholder until the registry assigns ids in registry order
            id: ScenarioId(0),
            category,
            invocation,
            run_condition,
            checker_condition,
            span,
        }),
        _ => Err(problems),
    }
}

fn condition(field: &Field, problems: &mut Vec<Problem>) -> Option<Condition> {
    let parsed = Condition::from_spelling(&field.text);
    if parsed.is_none() {
        problems.push(
            Problem::new(ProblemKind::UnknownCondition(field.text.clone()), field.span)
                .with_help(format!("expected one of {}", spelling_list())),
        );
    }
    parsed
}

fn spelling_list() -> String {
    Condition::SPELLINGS
        .iter()
        .map(|s| format!("`{}`", s))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a token stream produced by [`crate::lexer::lex`].
pub fn parse(tokens: &[Token]) -> (ParsedList, Vec<Problem>) {
    Parser::new(tokens).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_source(source: &str) -> (ParsedList, Vec<Problem>) {
        let (tokens, lex_problems) = lex(source);
        assert!(lex_problems.is_empty(), "lexer problems: {:?}", lex_problems);
        parse(&tokens)
    }

    #[test]
    fn test_parse_native_and_scripted() {
        let source = r#"
cpp_examples = [
    ("lena-simple", "True", "True"),
    ("lena-simple-ngc --simTime=1.1", "options.valgrind", "True"),
]
python_examples = [
    ("sample.py --n=2", "True"),
]
"#;
        let (list, problems) = parse_source(source);
        assert!(problems.is_empty(), "{:?}", problems);
        assert_eq!(list.native.len(), 2);
        assert_eq!(list.scripted.len(), 1);

        let second = &list.native[1];
        assert_eq!(second.invocation.as_str(), "lena-simple-ngc --simTime=1.1");
        assert_eq!(second.run_condition, Condition::CheckerRequested);
        assert_eq!(second.checker_condition, Condition::Always);

        let script = &list.scripted[0];
        assert_eq!(script.category, Category::Scripted);
        assert_eq!(script.checker_condition, Condition::Never);
    }

    #[test]
    fn test_parse_empty_lists_and_bare_conditions() {
        let (list, problems) = parse_source("native_examples = [(\"a\", True, False)]\nscripted_examples = []");
        assert!(problems.is_empty());
        assert_eq!(list.native[0].run_condition, Condition::Always);
        assert_eq!(list.native[0].checker_condition, Condition::Never);
        assert!(list.scripted.is_empty());
    }

    #[test]
    fn test_parse_unknown_condition_is_reported_with_span() {
        let source = "cpp_examples = [(\"a\", \"options.fast\", \"True\")]";
        let (list, problems) = parse_source(source);
        assert!(list.native.is_empty());
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].kind, ProblemKind::UnknownCondition("options.fast".into()));
        let span = problems[0].span();
        assert_eq!(&source[span.start..span.end], "\"options.fast\"");
        assert!(problems[0].help.as_deref().unwrap_or("").contains("options.valgrind"));
    }

    #[test]
    fn test_parse_arity_errors() {
        let (_, problems) = parse_source("cpp_examples = [(\"a\", \"True\")]");
        assert!(matches!(
            problems[0].kind,
            ProblemKind::Arity {
                expected: "3",
                found: 2,
                ..
            }
        ));

        let (_, problems) = parse_source("python_examples = [(\"a\",)]");
        assert!(matches!(problems[0].kind, ProblemKind::Arity { found: 1, .. }));
    }

    #[test]
    fn test_parse_empty_invocation() {
        let (_, problems) = parse_source("cpp_examples = [(\"  \", \"True\", \"True\")]");
        assert_eq!(problems[0].kind, ProblemKind::EmptyInvocation);
    }

    #[test]
    fn test_parse_unknown_and_duplicate_categories() {
        let source = "rust_examples = [(\"a\", \"True\", \"True\")]\ncpp_examples = []\nnative_examples = []";
        let (_, problems) = parse_source(source);
        let kinds: Vec<_> = problems.iter().map(|p| p.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                ProblemKind::UnknownCategory("rust_examples".into()),
                ProblemKind::DuplicateCategory("native_examples".into()),
            ]
        );
    }

    #[test]
    fn test_parse_recovers_after_bad_entry() {
        let source = r#"
cpp_examples = [
    ("a", "True", "True"),
    ("b" "True", "True"),
    ("c", "Maybe", "True"),
    ("d", "True", "True"),
]
"#;
        let (list, problems) = parse_source(source);
        let names: Vec<_> = list.native.iter().map(|s| s.invocation.as_str()).collect();
        assert_eq!(names, vec!["a", "d"]);
        assert_eq!(problems.len(), 2);
        assert!(matches!(problems[0].kind, ProblemKind::Expected { .. }));
        assert_eq!(problems[1].kind, ProblemKind::UnknownCondition("Maybe".into()));
    }

    #[test]
    fn test_parse_missing_equals_recovers_to_next_assignment() {
        let source = "cpp_examples [(\"a\", \"True\", \"True\")]\npython_examples = [(\"s.py\", \"True\")]";
        let (list, problems) = parse_source(source);
        assert_eq!(problems.len(), 1);
        assert_eq!(list.scripted.len(), 1);
    }

    #[test]
    fn test_parse_unclosed_list() {
        let (_, problems) = parse_source("cpp_examples = [(\"a\", \"True\", \"True\"),");
        assert_eq!(problems.len(), 1);
        assert!(matches!(&problems[0].kind, ProblemKind::Expected { found, .. } if found == "end of file"));
    }

    #[test]
    fn test_parse_entry_cut_off_at_end_of_file() {
        let source = "native_examples = [(\"a\", \"True\"";
        let (list, problems) = parse_source(source);
        assert!(list.native.is_empty());
        assert_eq!(problems.len(), 1, "{:?}", problems);
        assert!(matches!(&problems[0].kind, ProblemKind::Expected { found, .. } if found == "end of file"));
    }

    #[test]
    fn test_parse_empty_token_slice() {
        let (list, problems) = parse(&[]);
        assert!(list.native.is_empty());
        assert!(list.scripted.is_empty());
        assert!(problems.is_empty());
    }

    #[test]
    fn test_parse_stream_without_eof() {
        let (tokens, _) = lex("scripted_examples = []");
        let trimmed = &tokens[..tokens.len() - 1];
        let (list, problems) = parse(trimmed);
        assert!(list.scripted.is_empty());
        assert!(problems.is_empty());
    }
}
