//! Run orchestrator: selection, bounded concurrent dispatch, cancellation.
//!
//! Every selected scenario becomes one task on a [`JoinSet`]; at most `jobs` tasks are in flight.
//! Tasks share the registry and options read-only and hand their [`ExecutionResult`] back by value,
//! so there is no shared mutable state between scenario runs.
//!
//! Aborting a task drops its child process handle, and children are spawned with `kill_on_drop`, so
//! cancellation and fatal errors never leave orphaned processes behind.

use std::future::Future;
use std::sync::Arc;

use exrun_registry::{Registry, Scenario};
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::HarnessError;
use super::driver::{ExecutionDriver, Launcher};
use super::options::RunOptions;
use super::report::Reporter;
use super::result::ExecutionResult;

/// Scenarios of `registry` selected by the category and name filters, in registry order.
pub fn select<'a>(registry: &'a Registry, options: &RunOptions) -> Vec<&'a Scenario> {
    registry.scenarios().iter().filter(|s| options.selects(s)).collect()
}

/// Run every selected scenario and collect the results in registry order.
///
/// `cancel` resolves on a run-level interrupt (the CLI passes Ctrl-C). The reporter sees
/// `on_run_start` and `on_result` only; rendering the final report is left to the caller once it has
/// the summary.
///
/// ## Errors
/// - [`HarnessError::Config`] for invalid options, before anything is launched.
/// - [`HarnessError::Infrastructure`] when a worker cannot make progress; remaining workers are
///   aborted.
/// - [`HarnessError::Interrupted`] when `cancel` resolves first; in-flight workers are aborted.
pub async fn run_all<L, C>(
    registry: Arc<Registry>,
    options: Arc<RunOptions>,
    launcher: Arc<L>,
    reporter: &mut dyn Reporter,
    cancel: C,
) -> Result<Vec<ExecutionResult>, HarnessError>
where
    L: Launcher,
    C: Future<Output = ()>,
{
    options.validate()?;
    if options.checker_requested && !options.checker_available {
        warn!(
            checker = %options.checker.program,
            "checker runs requested but the checker is not installed; skipping checker runs"
        );
    }

    let selected: Vec<Scenario> = select(&registry, &options).into_iter().cloned().collect();
    info!(
        registry = registry.name(),
        selected = selected.len(),
        jobs = options.jobs,
        "starting run"
    );
    reporter.on_run_start(selected.len()).map_err(report_error)?;

    let driver = Arc::new(ExecutionDriver::new(launcher, Arc::clone(&options)));
    let mut pending = selected.into_iter();
    let mut tasks: JoinSet<Result<ExecutionResult, HarnessError>> = JoinSet::new();
    let mut results = Vec::new();
    let mut stopping = false;

    tokio::pin!(cancel);

    loop {
        while !stopping && tasks.len() < options.jobs {
            let Some(scenario) = pending.next() else {
                break;
            };
            let driver = Arc::clone(&driver);
            tasks.spawn(async move { driver.run(&scenario).await });
        }

        let joined = tokio::select! {
            biased;
            _ = &mut cancel => {
                warn!(in_flight = tasks.len(), "run interrupted, killing in-flight scenarios");
                shutdown(&mut tasks).await;
                return Err(HarnessError::Interrupted);
            }
            joined = tasks.join_next() => joined,
        };

        // Nothing in flight and nothing left to dispatch
        let Some(joined) = joined else {
            break;
        };

        let result = match joined {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                shutdown(&mut tasks).await;
                return Err(err);
            }
            Err(join_err) => {
                shutdown(&mut tasks).await;
                return Err(HarnessError::Infrastructure(format!(
                    "scenario worker failed: {}",
                    join_err
                )));
            }
        };

        if result.failed() && options.stop_on_fail && !stopping {
            info!(scenario = %result.invocation, "stopping after first failure");
            stopping = true;
        }
        reporter.on_result(&result).map_err(report_error)?;
        results.push(result);
    }

    results.sort_by_key(|r| r.id);
    info!(completed = results.len(), "run finished");
    Ok(results)
}

async fn shutdown(tasks: &mut JoinSet<Result<ExecutionResult, HarnessError>>) {
    tasks.abort_all();
    while tasks.join_next().await.is_some() {}
}

fn report_error(err: std::io::Error) -> HarnessError {
    HarnessError::Infrastructure(format!("cannot write report: {}", err))
}
