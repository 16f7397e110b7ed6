//! The regression harness: run options, condition evaluation, execution, orchestration, reporting.
//!
//! ## Modules
//!
//! - `options` - `RunOptions`, built once per invocation and shared read-only
//! - `condition` - late-bound evaluation of scenario conditions
//! - `driver` - launches one scenario (plus its optional checker run)
//! - `orchestrator` - filters, bounded concurrent dispatch, cancellation
//! - `result` - per-scenario outcomes
//! - `report` - summary and reporters
//!
//! ## Error taxonomy
//!
//! Scenario and checker-run failures are data ([`ExecutionResult`]) and never abort a run. Only
//! configuration problems, infrastructure failures and interrupts surface as [`HarnessError`].

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod condition;
pub mod driver;
pub mod options;
pub mod orchestrator;
pub mod report;
pub mod result;

use thiserror::Error;

pub use condition::{evaluate, should_run, should_run_checker};
pub use driver::{ExecutionDriver, LaunchError, LaunchRequest, Launcher, ProcessLauncher, ProcessOutcome, Termination};
pub use options::{CategoryFilter, CheckerConfig, RunOptions};
pub use orchestrator::{run_all, select};
pub use report::{ConsoleReporter, JsonReporter, Reporter, Summary, summarize};
pub use result::{ExecutionResult, RunRecord, RunStatus};

/// Errors that end a harness run.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Invalid options; nothing was launched.
    #[error("configuration error: {0}")]
    Config(String),

    /// The harness cannot make progress (cannot fork, cannot create work directories, ...).
    #[error("infrastructure failure: {0}")]
    Infrastructure(String),

    #[error("run interrupted")]
    Interrupted,
}
