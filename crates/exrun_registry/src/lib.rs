//! Scenario-list format for the exrun regression harness: lexer, parser, diagnostics, registry.
//!
//! A scenario list declares, per category, which example programs the harness should run and
//! under which conditions:
//!
//! ```text
//! native_examples = [
//!     ("lena-simple", "True", "True"),
//!     ("lena-simple-ngc --simTime=1.1", "options.valgrind", "True"),
//! ]
//! scripted_examples = []
//! ```
//!
//! ## Notes
//! - This crate is "syntax-only": it never evaluates conditions and never launches processes.
//! - Conditions form a closed vocabulary ([`Condition`]); an unknown spelling is a load error, never
//!   a silent default.
//!
//! ## Examples
//! ```rust
//! let registry = exrun_registry::load("inline", r#"cpp_examples = [("demo --simTime=0.01", "True", "options.valgrind")]"#)
//!     .unwrap();
//! assert_eq!(registry.len(), 1);
//! assert_eq!(registry.scenarios()[0].invocation.program(), "demo");
//! ```

pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod registry;
pub mod scenario;

pub use diagnostics::{Problem, ProblemKind, RegistryError, Span};
pub use registry::Registry;
pub use scenario::{Category, Condition, Invocation, Scenario, ScenarioId};

/// Load a scenario list from source text.
///
/// `name` is used for diagnostics and as the registry name (usually the file path).
///
/// ## Errors
/// - [`RegistryError::Invalid`] with every lexical, syntactic and vocabulary problem found.
/// - [`RegistryError::Empty`] when the list declares no scenarios at all.
pub fn load(name: &str, source: &str) -> Result<Registry, RegistryError> {
    let (tokens, mut problems) = lexer::lex(source);
    let (list, parse_problems) = parser::parse(&tokens);
    problems.extend(parse_problems);

    if !problems.is_empty() {
        problems.sort_by_key(|p| p.span().start);
        tracing::debug!(list = name, count = problems.len(), "scenario list rejected");
        return Err(RegistryError::invalid(name, source, problems));
    }

    let registry = Registry::new(name, list.native, list.scripted)?;
    tracing::debug!(list = name, scenarios = registry.len(), "scenario list loaded");
    Ok(registry)
}
