//! Diagnostics for scenario lists.
//!
//! Every problem found while lexing or parsing a scenario list is collected as a [`Problem`] with a
//! byte span into the source. The problems of one file are bundled into a single
//! [`RegistryError::Invalid`] so `miette` can render all of them against the same source.

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Byte range into a scenario-list source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        (span.start, span.len()).into()
    }
}

/// What went wrong at a given location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProblemKind {
    #[error("unexpected character `{0}`")]
    UnexpectedChar(char),

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("expected {expected}, found {found}")]
    Expected { expected: &'static str, found: String },

    #[error("unknown scenario category `{0}`")]
    UnknownCategory(String),

    #[error("scenario category `{0}` is defined more than once")]
    DuplicateCategory(String),

    #[error("unknown condition `{0}`")]
    UnknownCondition(String),

    #[error("invocation is empty")]
    EmptyInvocation,

    #[error("{category} entries take {expected} fields, found {found}")]
    Arity {
        category: &'static str,
        expected: &'static str,
        found: usize,
    },
}

/// A single located problem in a scenario list.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("{kind}")]
pub struct Problem {
    pub kind: ProblemKind,
    #[label("here")]
    pub location: SourceSpan,
    #[help]
    pub help: Option<String>,
}

impl Problem {
    pub fn new(kind: ProblemKind, span: Span) -> Self {
        Self {
            kind,
            location: span.into(),
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Location of the problem as a byte range.
    pub fn span(&self) -> Span {
        Span::new(self.location.offset(), self.location.offset() + self.location.len())
    }
}

/// Configuration error raised while loading a scenario list.
///
/// Both variants are fatal for a harness run: nothing is executed once loading fails.
#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    #[error("scenario list `{name}` is invalid ({count} problem(s))", count = .problems.len())]
    #[diagnostic(code(exrun::registry::invalid))]
    Invalid {
        name: String,
        #[source_code]
        src: NamedSource<String>,
        #[related]
        problems: Vec<Problem>,
    },

    #[error("scenario list `{name}` contains no scenarios")]
    #[diagnostic(
        code(exrun::registry::empty),
        help("add at least one entry to `native_examples` or `scripted_examples`")
    )]
    Empty { name: String },
}

impl RegistryError {
    pub(crate) fn invalid(name: &str, source: &str, problems: Vec<Problem>) -> Self {
        RegistryError::Invalid {
            name: name.to_string(),
            src: NamedSource::new(name, source.to_string()),
            problems,
        }
    }

    /// The located problems, empty for [`RegistryError::Empty`].
    pub fn problems(&self) -> &[Problem] {
        match self {
            RegistryError::Invalid { problems, .. } => problems,
            RegistryError::Empty { .. } => &[],
        }
    }
}
