//! CLI module for the exrun regression harness
//!
//! This module provides the command-line interface for running the example registry.
//!
//! ## Commands
//!
//! - `run` - Run the selected scenarios and report
//! - `list` - Show the selected scenarios and what a run would do with them
//!
//! ## Modules
//!
//! - `commands` - Command implementations
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::harness::{CategoryFilter, HarnessError};
use crate::version::EXRUN_VERSION;
use exrun_registry::Category;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    /// At least one attempted scenario failed.
    pub const FAILURE: ExitCode = ExitCode(1);
    /// Invalid scenario list or options; nothing was run.
    pub const CONFIG: ExitCode = ExitCode(2);
    /// The harness itself could not make progress.
    pub const INFRASTRUCTURE: ExitCode = ExitCode(3);
    pub const INTERRUPTED: ExitCode = ExitCode(130);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Create a configuration error (exit code 2).
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::CONFIG)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<HarnessError> for CliError {
    fn from(err: HarnessError) -> Self {
        let exit_code = match &err {
            HarnessError::Config(_) => ExitCode::CONFIG,
            HarnessError::Infrastructure(_) => ExitCode::INFRASTRUCTURE,
            HarnessError::Interrupted => ExitCode::INTERRUPTED,
        };
        CliError::new(format!("Error: {}", err), exit_code)
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Regression harness for simulation example programs
#[derive(Parser, Debug)]
#[command(name = "exrun")]
#[command(version = EXRUN_VERSION)]
#[command(about = "Run the example registry and report whether every example still works", long_about = None)]
pub struct Cli {
    /// Scenario list to use (default: the built-in NR example list)
    #[arg(long, global = true, env = "EXRUN_REGISTRY", value_name = "FILE")]
    pub registry: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the selected scenarios
    Run(RunArgs),

    /// List the selected scenarios and whether they would run
    List(ListArgs),
}

/// Category selection on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryArg {
    #[default]
    All,
    Native,
    Scripted,
}

impl From<CategoryArg> for CategoryFilter {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::All => CategoryFilter::All,
            CategoryArg::Native => CategoryFilter::Only(Category::Native),
            CategoryArg::Scripted => CategoryFilter::Only(Category::Scripted),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Which scenarios to consider.
#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    /// Only scenarios of this category
    #[arg(long, value_enum, default_value_t = CategoryArg::All)]
    pub category: CategoryArg,

    /// Only scenarios whose invocation contains this substring
    #[arg(short = 'k', long = "example", value_name = "SUBSTR")]
    pub example: Option<String>,
}

/// Memory-checker settings.
#[derive(Args, Debug, Clone)]
pub struct CheckerArgs {
    /// Also run eligible scenarios under the memory checker
    #[arg(long = "valgrind", visible_alias = "checker-run")]
    pub requested: bool,

    /// Checker program
    #[arg(long = "checker", env = "EXRUN_CHECKER", default_value = "valgrind", value_name = "PROG")]
    pub program: String,

    /// Argument passed to the checker before the program (repeatable; replaces the defaults)
    #[arg(long = "checker-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Checker suppressions file
    #[arg(long, value_name = "FILE")]
    pub suppressions: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    #[command(flatten)]
    pub checker: CheckerArgs,

    /// Maximum number of scenarios run concurrently
    #[arg(short = 'j', long, default_value_t = 1, value_name = "N")]
    pub jobs: usize,

    /// Per-scenario timeout in seconds
    #[arg(long, env = "EXRUN_TIMEOUT", default_value_t = 600, value_name = "SECS")]
    pub timeout: u64,

    /// Directory holding the native example executables
    #[arg(long, env = "EXRUN_EXAMPLE_DIR", value_name = "DIR")]
    pub example_dir: Option<PathBuf>,

    /// Directory holding the example scripts
    #[arg(long, value_name = "DIR")]
    pub script_dir: Option<PathBuf>,

    /// Interpreter for scripted scenarios
    #[arg(long, env = "EXRUN_INTERPRETER", default_value = "python3", value_name = "PROG")]
    pub interpreter: String,

    /// Root for per-scenario work directories
    #[arg(long = "work-dir", default_value = "target/exrun", value_name = "DIR")]
    pub work_dir: PathBuf,

    /// Run every scenario in the current directory instead of its own work directory
    #[arg(long)]
    pub shared_cwd: bool,

    /// Stop on first failure
    #[arg(short = 'x', long = "exitfirst")]
    pub stop_on_fail: bool,

    /// Verbose output (captured output of failed runs)
    #[arg(short, long)]
    pub verbose: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    #[command(flatten)]
    pub checker: CheckerArgs,
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    let registry = cli.registry.as_deref();
    match cli.command {
        Command::Run(args) => commands::run_examples(registry, &args),
        Command::List(args) => commands::list_examples(registry, &args),
    }
}

// ============================================================================
// Tests
// ============================================================================
