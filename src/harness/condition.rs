//! Condition evaluation against run-time options.
//!
//! Conditions are bound late: they are evaluated against the `RunOptions` of the current run,
//! never captured when the scenario list is loaded. The vocabulary is closed, so evaluation is
//! total; unknown spellings were already rejected by the scenario-list loader.

use exrun_registry::{Condition, Scenario};

use super::options::RunOptions;

/// Evaluate a condition for the current run. Pure and side-effect free.
pub fn evaluate(condition: Condition, options: &RunOptions) -> bool {
    match condition {
        Condition::Always => true,
        Condition::Never => false,
        Condition::CheckerRequested => options.checker_requested,
    }
}

/// Whether the scenario's plain run is attempted.
pub fn should_run(scenario: &Scenario, options: &RunOptions) -> bool {
    evaluate(scenario.run_condition, options)
}

/// Whether the scenario additionally runs under the checker.
///
/// Requires the plain run to be attempted, the checker condition to hold, and the checker to be
/// both requested and installed.
pub fn should_run_checker(scenario: &Scenario, options: &RunOptions) -> bool {
    should_run(scenario, options) && evaluate(scenario.checker_condition, options) && options.checker_enabled()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use exrun_registry::{Category, Invocation, ScenarioId, Span};

    fn scenario(run: Condition, checker: Condition) -> Scenario {
        Scenario {
            id: ScenarioId(0),
            category: Category::Native,
            invocation: Invocation::new("demo --simTime=0.01").unwrap(),
            run_condition: run,
            checker_condition: checker,
            span: Span::default(),
        }
    }

    #[test]
    fn test_evaluate_literals() {
        let options = RunOptions::new();
        assert!(evaluate(Condition::Always, &options));
        assert!(!evaluate(Condition::Never, &options));
    }

    #[test]
    fn test_evaluate_checker_requested_is_late_bound() {
        let off = RunOptions::new();
        let on = RunOptions::new().with_checker_requested(true);
        assert!(!evaluate(Condition::CheckerRequested, &off));
        assert!(evaluate(Condition::CheckerRequested, &on));
    }

    #[test]
    fn test_checker_run_requires_request_and_availability() {
        let s = scenario(Condition::Always, Condition::Always);

        assert!(!should_run_checker(&s, &RunOptions::new()));
        assert!(!should_run_checker(
            &s,
            &RunOptions::new().with_checker_requested(true)
        ));
        assert!(should_run_checker(
            &s,
            &RunOptions::new()
                .with_checker_requested(true)
                .with_checker_available(true)
        ));
    }

    #[test]
    fn test_checker_run_never_without_plain_run() {
        let s = scenario(Condition::Never, Condition::Always);
        let options = RunOptions::new()
            .with_checker_requested(true)
            .with_checker_available(true);
        assert!(!should_run(&s, &options));
        assert!(!should_run_checker(&s, &options));
    }

    #[test]
    fn test_only_if_checker_requested_run_condition() {
        let s = scenario(Condition::CheckerRequested, Condition::Always);
        assert!(!should_run(&s, &RunOptions::new()));
        assert!(should_run(&s, &RunOptions::new().with_checker_requested(true)));
    }
}
