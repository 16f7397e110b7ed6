//! Run-time options for one harness invocation.
//!
//! `RunOptions` is built once at startup (normally from CLI flags) and then shared read-only by
//! every worker for the whole run. Nothing in a scenario run can mutate it.

use std::path::PathBuf;
use std::time::Duration;

use exrun_registry::{Category, Scenario};

use super::HarnessError;

/// Default per-scenario timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Default arguments handed to the checker before the wrapped program.
pub const DEFAULT_CHECKER_ARGS: &[&str] = &[
    "--leak-check=full",
    "--show-reachable=yes",
    "--error-exitcode=2",
    "--errors-for-leak-kinds=all",
];

/// Which categories of scenarios a run selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn admits(self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(only) => only == category,
        }
    }
}

/// How to wrap a program in the memory checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerConfig {
    /// Checker executable (looked up on PATH when not a path).
    pub program: String,
    /// Arguments placed between the checker and the wrapped program.
    pub args: Vec<String>,
    /// Optional suppressions file, passed as `--suppressions=FILE`.
    pub suppressions: Option<PathBuf>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            program: "valgrind".to_string(),
            args: DEFAULT_CHECKER_ARGS.iter().map(|s| s.to_string()).collect(),
            suppressions: None,
        }
    }
}

impl CheckerConfig {
    /// Full argument list that precedes the wrapped program.
    pub fn launcher_args(&self) -> Vec<String> {
        let mut args = self.args.clone();
        if let Some(path) = &self.suppressions {
            args.push(format!("--suppressions={}", path.display()));
        }
        args
    }

    /// Whether the checker program can be found.
    pub fn is_installed(&self) -> bool {
        which::which(&self.program).is_ok()
    }
}

/// Options for a single harness run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Checker-wrapped runs were asked for on this invocation.
    pub checker_requested: bool,
    /// The checker tool is installed.
    pub checker_available: bool,
    pub checker: CheckerConfig,
    pub category: CategoryFilter,
    /// Substring an invocation must contain to be selected.
    pub name_filter: Option<String>,
    /// Maximum number of scenarios in flight.
    pub jobs: usize,
    pub timeout: Duration,
    /// Directory holding native example executables.
    pub example_dir: Option<PathBuf>,
    /// Directory holding example scripts.
    pub script_dir: Option<PathBuf>,
    /// Interpreter used for scripted scenarios.
    pub interpreter: String,
    /// Root under which per-scenario work directories are created.
    pub work_root: PathBuf,
    /// Give every scenario its own work directory.
    pub isolate: bool,
    /// Stop dispatching new scenarios after the first failure.
    pub stop_on_fail: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            checker_requested: false,
            checker_available: false,
            checker: CheckerConfig::default(),
            category: CategoryFilter::All,
            name_filter: None,
            jobs: 1,
            timeout: DEFAULT_TIMEOUT,
            example_dir: None,
            script_dir: None,
            interpreter: "python3".to_string(),
            work_root: PathBuf::from("target/exrun"),
            isolate: true,
            stop_on_fail: false,
        }
    }
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request checker-wrapped runs.
    pub fn with_checker_requested(mut self, requested: bool) -> Self {
        self.checker_requested = requested;
        self
    }

    /// Override checker availability (normally resolved with [`RunOptions::detect_checker`]).
    pub fn with_checker_available(mut self, available: bool) -> Self {
        self.checker_available = available;
        self
    }

    pub fn with_checker(mut self, checker: CheckerConfig) -> Self {
        self.checker = checker;
        self
    }

    pub fn with_category(mut self, category: CategoryFilter) -> Self {
        self.category = category;
        self
    }

    pub fn with_name_filter(mut self, filter: Option<String>) -> Self {
        self.name_filter = filter.filter(|f| !f.is_empty());
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_example_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.example_dir = dir;
        self
    }

    pub fn with_script_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.script_dir = dir;
        self
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = root.into();
        self
    }

    pub fn with_isolation(mut self, isolate: bool) -> Self {
        self.isolate = isolate;
        self
    }

    pub fn with_stop_on_fail(mut self, stop: bool) -> Self {
        self.stop_on_fail = stop;
        self
    }

    /// Resolve whether the configured checker is installed.
    pub fn detect_checker(mut self) -> Self {
        self.checker_available = self.checker.is_installed();
        self
    }

    /// Checker runs are possible on this invocation: requested and installed.
    pub fn checker_enabled(&self) -> bool {
        self.checker_requested && self.checker_available
    }

    /// Category and name filters, applied before any condition is evaluated.
    pub fn selects(&self, scenario: &Scenario) -> bool {
        self.category.admits(scenario.category)
            && self
                .name_filter
                .as_deref()
                .is_none_or(|needle| scenario.invocation.as_str().contains(needle))
    }

    /// Reject option combinations that cannot make progress.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.jobs == 0 {
            return Err(HarnessError::Config("concurrency must be at least 1".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(HarnessError::Config("per-scenario timeout must be positive".to_string()));
        }
        if self.interpreter.trim().is_empty() {
            return Err(HarnessError::Config("script interpreter must not be empty".to_string()));
        }
        if self.checker_requested && self.checker.program.trim().is_empty() {
            return Err(HarnessError::Config("checker program must not be empty".to_string()));
        }
        Ok(())
    }
}
