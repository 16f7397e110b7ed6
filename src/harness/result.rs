//! Per-scenario execution results.

use std::time::Duration;

use exrun_registry::{Category, Invocation, Scenario, ScenarioId};

/// How one process run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Passed,
    /// Exited with a non-zero code.
    Failed(i32),
    /// Terminated by a signal without an exit code.
    Signaled,
    /// Exceeded the per-scenario timeout and was killed.
    TimedOut(Duration),
    /// Could not be started (missing executable, permission denied, ...).
    LaunchFailed(String),
}

/// Outcome of one process run (plain or checker-wrapped).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub status: RunStatus,
    pub duration: Duration,
    pub stdout: String,
    pub stderr: String,
}

impl RunRecord {
    pub fn launch_failed(message: impl Into<String>, duration: Duration) -> Self {
        Self {
            status: RunStatus::LaunchFailed(message.into()),
            duration,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn passed(&self) -> bool {
        self.status == RunStatus::Passed
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self.status {
            RunStatus::Passed => Some(0),
            RunStatus::Failed(code) => Some(code),
            _ => None,
        }
    }

    /// Short reason for a failed run; `None` when it passed.
    pub fn failure_reason(&self) -> Option<String> {
        match &self.status {
            RunStatus::Passed => None,
            RunStatus::Failed(code) => Some(format!("exit code {}", code)),
            RunStatus::Signaled => Some("killed by signal".to_string()),
            RunStatus::TimedOut(limit) => Some(format!("timed out after {}s", limit.as_secs_f64())),
            RunStatus::LaunchFailed(msg) => Some(format!("launch failed: {}", msg)),
        }
    }
}

/// Everything the harness learned about one scenario.
///
/// The plain run and the checker run are two independent slots: either may fail without affecting
/// how the other is classified. Produced once by the execution driver and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub id: ScenarioId,
    pub category: Category,
    pub invocation: Invocation,
    /// `None` when the run condition was false.
    pub plain: Option<RunRecord>,
    /// `None` when no checker run was attempted.
    pub checker: Option<RunRecord>,
}

impl ExecutionResult {
    /// A deliberately skipped scenario.
    pub fn skipped(scenario: &Scenario) -> Self {
        Self {
            id: scenario.id,
            category: scenario.category,
            invocation: scenario.invocation.clone(),
            plain: None,
            checker: None,
        }
    }

    pub fn attempted(&self) -> bool {
        self.plain.is_some()
    }

    /// Plain run passed. False when not attempted.
    pub fn passed(&self) -> bool {
        self.plain.as_ref().is_some_and(RunRecord::passed)
    }

    pub fn checker_attempted(&self) -> bool {
        self.checker.is_some()
    }

    /// Checker run passed. False when not attempted.
    pub fn checker_passed(&self) -> bool {
        self.checker.as_ref().is_some_and(RunRecord::passed)
    }

    /// Attempted, and at least one attempted run failed.
    pub fn failed(&self) -> bool {
        self.attempted() && !(self.passed() && (!self.checker_attempted() || self.checker_passed()))
    }

    pub fn duration(&self) -> Duration {
        self.plain.as_ref().map(|r| r.duration).unwrap_or_default()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.plain.as_ref().and_then(RunRecord::exit_code)
    }
}
