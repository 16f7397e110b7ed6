//! The loaded, immutable scenario registry.

use crate::diagnostics::{RegistryError, Span};
use crate::scenario::{Category, Condition, Invocation, Scenario, ScenarioId};

/// Ordered, immutable collection of scenarios.
///
/// Registry order is every native scenario in declaration order, followed by every scripted
/// scenario in declaration order. `ScenarioId(n)` is the n-th scenario in that order. A registry is
/// never mutated after construction, so it can be shared freely (typically behind an `Arc`) between
/// concurrent workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    name: String,
    scenarios: Vec<Scenario>,
}

impl Registry {
    /// Build a registry from per-category lists, assigning ids in registry order.
    ///
    /// ## Errors
    /// Returns [`RegistryError::Empty`] when both lists are empty.
    pub fn new(name: impl Into<String>, native: Vec<Scenario>, scripted: Vec<Scenario>) -> Result<Self, RegistryError> {
        let name = name.into();
        let scenarios: Vec<Scenario> = native
            .into_iter()
            .chain(scripted)
            .enumerate()
            .map(|(idx, scenario)| Scenario {
                id: ScenarioId(idx),
                ..scenario
            })
            .collect();

        if scenarios.is_empty() {
            return Err(RegistryError::Empty { name });
        }

        Ok(Self { name, scenarios })
    }

    /// Build a registry from plain entries, e.g. in tests or for built-in lists.
    ///
    /// Entries are regrouped by category; relative order within a category is kept.
    pub fn from_entries(
        name: impl Into<String>,
        entries: impl IntoIterator<Item = (Category, Invocation, Condition, Condition)>,
    ) -> Result<Self, RegistryError> {
        let mut native = Vec::new();
        let mut scripted = Vec::new();
        for (category, invocation, run_condition, checker_condition) in entries {
            let scenario = Scenario {
                id: ScenarioId(0),
                category,
                invocation,
                run_condition,
                checker_condition,
                span: Span::default(),
            };
            match category {
                Category::Native => native.push(scenario),
                Category::Scripted => scripted.push(scenario),
            }
        }
        Self::new(name, native, scripted)
    }

    /// Name the registry was loaded under (usually its file path).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All scenarios in registry order.
    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &Scenario> {
        self.scenarios.iter().filter(move |s| s.category == category)
    }

    pub fn get(&self, id: ScenarioId) -> Option<&Scenario> {
        self.scenarios.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Always false for a successfully constructed registry.
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}
