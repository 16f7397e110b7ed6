//! CLI command implementations.
//!
//! All commands return `CliResult<ExitCode>`; only `cli::run()` turns errors into a process exit.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use exrun_registry::{Registry, RegistryError};

use super::{CheckerArgs, CliError, CliResult, ExitCode, ListArgs, ReportFormat, RunArgs, SelectionArgs};
use crate::harness::options::DEFAULT_CHECKER_ARGS;
use crate::harness::{
    CheckerConfig, ConsoleReporter, JsonReporter, ProcessLauncher, Reporter, RunOptions, run_all, select,
    should_run, should_run_checker, summarize,
};

/// Scenario list used when `--registry` is not given.
const BUILTIN_REGISTRY: &str = include_str!("../../assets/nr-examples.list");
const BUILTIN_REGISTRY_NAME: &str = "<built-in nr examples>";

/// Maximum scenario-list size (16 MB)
const MAX_REGISTRY_SIZE: u64 = 16 * 1024 * 1024;

// ============================================================================
// Registry loading
// ============================================================================

/// Read a scenario-list file.
///
/// ## Errors
/// Returns a configuration error when the file cannot be read or exceeds `MAX_REGISTRY_SIZE`.
pub fn read_registry_source(path: &Path) -> CliResult<String> {
    let metadata = fs::metadata(path)
        .map_err(|e| CliError::config(format!("Cannot access scenario list '{}': {}", path.display(), e)))?;

    if metadata.len() > MAX_REGISTRY_SIZE {
        return Err(CliError::config(format!(
            "Scenario list '{}' is too large ({} bytes, max {} bytes)",
            path.display(),
            metadata.len(),
            MAX_REGISTRY_SIZE
        )));
    }

    fs::read_to_string(path)
        .map_err(|e| CliError::config(format!("Error reading scenario list '{}': {}", path.display(), e)))
}

/// Load the scenario list at `path`, or the built-in one.
pub fn load_registry(path: Option<&Path>) -> CliResult<Registry> {
    let loaded = match path {
        Some(path) => {
            let source = read_registry_source(path)?;
            exrun_registry::load(&path.display().to_string(), &source)
        }
        None => exrun_registry::load(BUILTIN_REGISTRY_NAME, BUILTIN_REGISTRY),
    };
    loaded.map_err(registry_error)
}

/// Render a registry error with its source snippets.
fn registry_error(err: RegistryError) -> CliError {
    CliError::config(format!("{:?}", miette::Report::new(err)))
}

// ============================================================================
// Options
// ============================================================================

fn checker_config(args: &CheckerArgs) -> CheckerConfig {
    let checker_args = if args.args.is_empty() {
        DEFAULT_CHECKER_ARGS.iter().map(|s| s.to_string()).collect()
    } else {
        args.args.clone()
    };
    CheckerConfig {
        program: args.program.clone(),
        args: checker_args,
        suppressions: args.suppressions.clone(),
    }
}

fn base_options(selection: &SelectionArgs, checker: &CheckerArgs) -> RunOptions {
    let options = RunOptions::new()
        .with_category(selection.category.into())
        .with_name_filter(selection.example.clone())
        .with_checker(checker_config(checker))
        .with_checker_requested(checker.requested);

    // Only probe PATH when checker runs were asked for
    if checker.requested {
        options.detect_checker()
    } else {
        options
    }
}

/// Build the run options for `exrun run`.
pub fn build_options(args: &RunArgs) -> RunOptions {
    base_options(&args.selection, &args.checker)
        .with_jobs(args.jobs)
        .with_timeout(Duration::from_secs(args.timeout))
        .with_example_dir(args.example_dir.clone())
        .with_script_dir(args.script_dir.clone())
        .with_interpreter(args.interpreter.clone())
        .with_work_root(args.work_dir.clone())
        .with_isolation(!args.shared_cwd)
        .with_stop_on_fail(args.stop_on_fail)
}

// ============================================================================
// Commands
// ============================================================================

/// `exrun run`: run the selected scenarios and print the report on stdout.
pub fn run_examples(registry_path: Option<&Path>, args: &RunArgs) -> CliResult<ExitCode> {
    let registry = Arc::new(load_registry(registry_path)?);
    let options = Arc::new(build_options(args));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::new(format!("Error starting async runtime: {}", e), ExitCode::INFRASTRUCTURE))?;

    let stdout = io::stdout().lock();
    let mut reporter: Box<dyn Reporter> = match args.format {
        ReportFormat::Text => Box::new(ConsoleReporter::new(stdout, args.verbose)),
        ReportFormat::Json => Box::new(JsonReporter::new(stdout, args.verbose)),
    };

    let results = runtime.block_on(run_all(
        registry,
        options,
        Arc::new(ProcessLauncher),
        reporter.as_mut(),
        interrupted(),
    ))?;

    let summary = summarize(&results);
    reporter
        .on_run_complete(&results, &summary)
        .map_err(|e| CliError::new(format!("Error writing report: {}", e), ExitCode::INFRASTRUCTURE))?;

    if summary.success {
        Ok(ExitCode::SUCCESS)
    } else {
        // Report already printed
        Err(CliError::new("", ExitCode::FAILURE))
    }
}

/// `exrun list`: show the selection and what a run with these flags would do. Launches nothing.
pub fn list_examples(registry_path: Option<&Path>, args: &ListArgs) -> CliResult<ExitCode> {
    let registry = load_registry(registry_path)?;
    let options = base_options(&args.selection, &args.checker);

    let mut out = io::stdout().lock();
    write_listing(&mut out, &registry, &options)
        .map_err(|e| CliError::new(format!("Error writing listing: {}", e), ExitCode::INFRASTRUCTURE))?;
    Ok(ExitCode::SUCCESS)
}

/// One line per selected scenario: id, category, run/skip, checker marker, conditions, invocation.
pub fn write_listing(out: &mut impl Write, registry: &Registry, options: &RunOptions) -> io::Result<()> {
    let selected = select(registry, options);
    for scenario in &selected {
        let run = if should_run(scenario, options) { "run" } else { "skip" };
        let checker = if should_run_checker(scenario, options) { "checker" } else { "-" };
        writeln!(
            out,
            "{:>4}  {:<8}  {:<4}  {:<7}  ({}, {})  {}",
            scenario.id.0,
            scenario.category.as_str(),
            run,
            checker,
            scenario.run_condition,
            scenario.checker_condition,
            scenario.invocation
        )?;
    }
    writeln!(out, "{} of {} scenarios selected", selected.len(), registry.len())
}

/// Resolves on Ctrl-C. Never resolves if the signal handler cannot be installed.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
