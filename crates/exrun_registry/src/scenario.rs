//! Scenario value types.
//!
//! A scenario is one registered example invocation plus the two conditions that decide whether it
//! runs plainly and whether it additionally runs under the memory checker. All types here are plain
//! immutable values; evaluating a [`Condition`] against run-time options is the harness's job.

use std::fmt;

use crate::diagnostics::Span;

/// Which kind of example a scenario launches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// A compiled example executable.
    Native,
    /// An example script launched through an interpreter.
    Scripted,
}

impl Category {
    /// Every category, in registry order.
    pub const ALL: [Category; 2] = [Category::Native, Category::Scripted];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Native => "native",
            Category::Scripted => "scripted",
        }
    }

    /// Resolve the assignment name used in a scenario list.
    ///
    /// `cpp_examples` and `python_examples` are accepted so existing example lists load unchanged.
    pub fn from_list_name(name: &str) -> Option<Category> {
        match name {
            "native_examples" | "cpp_examples" => Some(Category::Native),
            "scripted_examples" | "python_examples" => Some(Category::Scripted),
            _ => None,
        }
    }

    /// Canonical assignment name for this category.
    pub fn list_name(self) -> &'static str {
        match self {
            Category::Native => "native_examples",
            Category::Scripted => "scripted_examples",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed vocabulary of run-time conditions a scenario may depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    Always,
    Never,
    /// True iff the invoking options asked for checker-wrapped runs.
    CheckerRequested,
}

impl Condition {
    /// Accepted spellings, used in diagnostics.
    pub const SPELLINGS: &'static [&'static str] = &["True", "False", "options.valgrind", "options.checker"];

    pub fn from_spelling(text: &str) -> Option<Condition> {
        match text.trim() {
            "True" => Some(Condition::Always),
            "False" => Some(Condition::Never),
            "options.valgrind" | "options.checker" => Some(Condition::CheckerRequested),
            _ => None,
        }
    }

    /// Canonical spelling as written in a scenario list.
    pub fn spelling(self) -> &'static str {
        match self {
            Condition::Always => "True",
            Condition::Never => "False",
            Condition::CheckerRequested => "options.valgrind",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spelling())
    }
}

/// Program name plus argument string, kept verbatim.
///
/// Only the split between the program and its arguments is ever looked at; arguments such as
/// `--simTime=0.01` are handed to the launcher untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Invocation {
    raw: String,
}

impl Invocation {
    /// Returns `None` when `raw` holds no program name.
    pub fn new(raw: impl Into<String>) -> Option<Invocation> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Invocation { raw })
        }
    }

    /// The invocation exactly as registered.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn program(&self) -> &str {
        self.raw.split_whitespace().next().unwrap_or_default()
    }

    pub fn args(&self) -> impl Iterator<Item = &str> {
        self.raw.split_whitespace().skip(1)
    }

    /// Filesystem-friendly rendering, used to name per-scenario work directories.
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.raw.len());
        let mut last_dash = true;
        for ch in self.raw.chars() {
            if ch.is_ascii_alphanumeric() || ch == '.' || ch == '_' {
                slug.push(ch);
                last_dash = false;
            } else if !last_dash {
                slug.push('-');
                last_dash = true;
            }
            if slug.len() >= 64 {
                break;
            }
        }
        slug.trim_end_matches('-').to_string()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Position of a scenario in registry order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScenarioId(pub usize);

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One registered example invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub id: ScenarioId,
    pub category: Category,
    pub invocation: Invocation,
    pub run_condition: Condition,
    pub checker_condition: Condition,
    /// Where the entry was declared; default for scenarios built in code.
    pub span: Span,
}
