//! End-to-end tests for the harness against real processes
//!
//! Scenarios use standard unix tools (`true`, `false`, `sleep`, `touch`, `sh`) as example
//! programs and `env` as a stand-in memory checker, so no simulation build is needed.

#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, Instant};

use exrun::harness::{
    CheckerConfig, ConsoleReporter, ExecutionResult, HarnessError, ProcessLauncher, RunOptions, RunStatus, run_all,
    summarize,
};
use nix::sys::signal::kill;
use nix::unistd::Pid;
use tempfile::TempDir;

async fn run_list(source: &str, options: RunOptions) -> Vec<ExecutionResult> {
    let registry = Arc::new(exrun::registry::load("test.list", source).unwrap());
    let mut reporter = ConsoleReporter::new(Vec::new(), false);
    run_all(
        registry,
        Arc::new(options),
        Arc::new(ProcessLauncher),
        &mut reporter,
        std::future::pending(),
    )
    .await
    .unwrap()
}

fn options(work: &TempDir) -> RunOptions {
    RunOptions::new()
        .with_work_root(work.path())
        .with_timeout(Duration::from_secs(30))
}

/// Write a script that backgrounds a long `sleep`, records its pid in `pid_file` and waits on it.
fn write_spawning_script(dir: &Path, pid_file: &Path) {
    let script = format!("sleep 47 &\necho $! > '{}'\nwait\n", pid_file.display());
    fs::write(dir.join("spawn.sh"), script).unwrap();
}

fn read_pid(pid_file: &Path) -> i32 {
    fs::read_to_string(pid_file).unwrap().trim().parse().unwrap()
}

/// Whether `pid` is a live process. Zombies awaiting their reaper count as gone.
fn process_running(pid: i32) -> bool {
    if let Ok(stat) = fs::read_to_string(format!("/proc/{}/stat", pid)) {
        // The state letter follows the parenthesised command name
        let state = stat.rsplit_once(')').and_then(|(_, rest)| rest.split_whitespace().next());
        return !matches!(state, Some("Z") | Some("X"));
    }
    kill(Pid::from_raw(pid), None).is_ok()
}

async fn wait_until_gone(pid: i32) -> bool {
    for _ in 0..40 {
        if !process_running(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

/// `env` runs the wrapped program and returns its exit code, which is all a checker run needs.
fn env_checker() -> CheckerConfig {
    CheckerConfig {
        program: "env".to_string(),
        args: Vec::new(),
        suppressions: None,
    }
}

// =============================================================================
// Conditions and outcomes
// =============================================================================

#[tokio::test]
async fn test_checker_not_requested_runs_plain_only() {
    let work = TempDir::new().unwrap();
    let results = run_list(
        "native_examples = [('true --simTime=0.01', 'True', 'options.valgrind')]",
        options(&work),
    )
    .await;

    assert_eq!(results.len(), 1);
    assert!(results[0].attempted());
    assert!(!results[0].checker_attempted());
    assert_eq!(results[0].exit_code(), Some(0));
    assert!(summarize(&results).success);
}

#[tokio::test]
async fn test_skip_and_failure_summary() {
    let work = TempDir::new().unwrap();
    let results = run_list(
        "native_examples = [('true', 'False', 'True'), ('false', 'True', 'True')]",
        options(&work),
    )
    .await;

    let summary = summarize(&results);
    assert_eq!(
        (summary.attempted, summary.passed, summary.failed, summary.skipped),
        (1, 0, 1, 1)
    );
    assert!(!summary.success);
    assert_eq!(results[1].exit_code(), Some(1));
}

#[tokio::test]
async fn test_timeout_kills_child() {
    let work = TempDir::new().unwrap();
    let opts = options(&work).with_timeout(Duration::from_millis(300));
    let results = run_list("native_examples = [('sleep 30', 'True', 'False')]", opts).await;

    let plain = results[0].plain.as_ref().unwrap();
    assert_eq!(plain.status, RunStatus::TimedOut(Duration::from_millis(300)));
    assert!(plain.duration < Duration::from_secs(10));
    assert!(results[0].failed());
}

#[tokio::test]
async fn test_timeout_kills_background_processes() {
    let work = TempDir::new().unwrap();
    let scripts = TempDir::new().unwrap();
    let pid_file = scripts.path().join("sleeper.pid");
    write_spawning_script(scripts.path(), &pid_file);

    let opts = options(&work)
        .with_timeout(Duration::from_millis(300))
        .with_interpreter("sh")
        .with_script_dir(Some(scripts.path().to_path_buf()));
    let start = Instant::now();
    let results = run_list("scripted_examples = [('spawn.sh', 'True')]", opts).await;
    let wall = start.elapsed();

    let plain = results[0].plain.as_ref().unwrap();
    assert_eq!(plain.status, RunStatus::TimedOut(Duration::from_millis(300)));
    // The backgrounded sleep must not hold the output pipes open
    assert!(wall < Duration::from_millis(1800), "run took {:?}", wall);
    assert!(wait_until_gone(read_pid(&pid_file)).await);
}

#[tokio::test]
async fn test_cancellation_kills_running_process_tree() {
    let work = TempDir::new().unwrap();
    let scripts = TempDir::new().unwrap();
    let pid_file = scripts.path().join("sleeper.pid");
    write_spawning_script(scripts.path(), &pid_file);

    let registry = Arc::new(exrun::registry::load("test.list", "scripted_examples = [('spawn.sh', 'True')]").unwrap());
    let opts = options(&work)
        .with_interpreter("sh")
        .with_script_dir(Some(scripts.path().to_path_buf()));
    let mut reporter = ConsoleReporter::new(Vec::new(), false);
    let outcome = run_all(
        registry,
        Arc::new(opts),
        Arc::new(ProcessLauncher),
        &mut reporter,
        tokio::time::sleep(Duration::from_millis(500)),
    )
    .await;

    assert!(matches!(outcome, Err(HarnessError::Interrupted)));
    assert!(wait_until_gone(read_pid(&pid_file)).await);
}

#[tokio::test]
async fn test_missing_executable_is_scenario_failure() {
    let work = TempDir::new().unwrap();
    let results = run_list(
        "native_examples = [('exrun-no-such-example-program', 'True', 'False'), ('true', 'True', 'False')]",
        options(&work),
    )
    .await;

    assert!(matches!(
        results[0].plain.as_ref().map(|r| &r.status),
        Some(RunStatus::LaunchFailed(_))
    ));
    assert!(results[1].passed());
    let summary = summarize(&results);
    assert_eq!((summary.passed, summary.failed), (1, 1));
}

#[tokio::test]
async fn test_output_is_captured() {
    let work = TempDir::new().unwrap();
    let results = run_list(
        "native_examples = [('sh -c echo_hello', 'True', 'False')]",
        options(&work).with_isolation(false),
    )
    .await;

    // `sh -c echo_hello` fails with "not found" on stderr
    let plain = results[0].plain.as_ref().unwrap();
    assert!(!plain.passed());
    assert!(plain.stderr.contains("echo_hello"));
}

// =============================================================================
// Checker runs
// =============================================================================

#[tokio::test]
async fn test_checker_run_wraps_program() {
    let work = TempDir::new().unwrap();
    let opts = options(&work)
        .with_checker(env_checker())
        .with_checker_requested(true)
        .with_checker_available(true);
    let results = run_list(
        "native_examples = [('true', 'True', 'True'), ('false', 'True', 'True'), ('true', 'True', 'False')]",
        opts,
    )
    .await;

    assert!(results[0].checker_passed());
    assert!(results[1].checker_attempted());
    assert!(!results[1].checker_passed());
    assert!(!results[2].checker_attempted());

    let summary = summarize(&results);
    assert_eq!(summary.checker_attempted, 2);
    assert_eq!(summary.checker_failed, 1);
    assert!(!summary.success);
}

#[tokio::test]
async fn test_checker_requested_only_scenario_runs_when_requested() {
    let work = TempDir::new().unwrap();
    let source = "native_examples = [('true --simTime=1.1', 'options.valgrind', 'True')]";

    let off = run_list(source, options(&work)).await;
    assert!(!off[0].attempted());

    let on = run_list(
        source,
        options(&work)
            .with_checker(env_checker())
            .with_checker_requested(true)
            .with_checker_available(true),
    )
    .await;
    assert!(on[0].passed());
    assert!(on[0].checker_passed());
}

// =============================================================================
// Isolation, scripts, determinism
// =============================================================================

#[tokio::test]
async fn test_each_scenario_gets_own_work_dir() {
    let work = TempDir::new().unwrap();
    let results = run_list(
        "native_examples = [('touch marker', 'True', 'False'), ('touch marker --', 'True', 'False')]",
        options(&work),
    )
    .await;

    assert!(results.iter().all(ExecutionResult::passed));
    assert!(work.path().join("0000-touch-marker/marker").is_file());
    assert!(work.path().join("0001-touch-marker/marker").is_file());
}

#[tokio::test]
async fn test_rerun_on_same_work_root_starts_clean() {
    let work = TempDir::new().unwrap();
    let source = "native_examples = [('mkdir out', 'True', 'False')]";

    for round in 0..2 {
        let results = run_list(source, options(&work)).await;
        assert!(results[0].passed(), "round {} failed: {:?}", round, results[0].plain);
    }
}

#[tokio::test]
async fn test_scripted_scenario_runs_through_interpreter() {
    let work = TempDir::new().unwrap();
    let scripts = TempDir::new().unwrap();
    fs::write(scripts.path().join("ok.sh"), "exit 0\n").unwrap();
    fs::write(scripts.path().join("bad.sh"), "exit 4\n").unwrap();

    let opts = options(&work)
        .with_interpreter("sh")
        .with_script_dir(Some(scripts.path().to_path_buf()));
    let results = run_list(
        "scripted_examples = [('ok.sh', 'True'), ('bad.sh', 'True')]",
        opts,
    )
    .await;

    assert!(results[0].passed());
    assert_eq!(results[1].exit_code(), Some(4));
}

#[tokio::test]
async fn test_same_inputs_same_summary() {
    let source = "native_examples = [('true', 'True', 'True'), ('false', 'True', 'True'), ('true', 'False', 'True')]";

    let first_work = TempDir::new().unwrap();
    let second_work = TempDir::new().unwrap();
    let first = run_list(source, options(&first_work).with_jobs(3)).await;
    let second = run_list(source, options(&second_work).with_jobs(3)).await;

    assert_eq!(summarize(&first), summarize(&second));
    let statuses = |results: &[ExecutionResult]| -> Vec<_> {
        results
            .iter()
            .map(|r| (r.id, r.plain.as_ref().map(|p| p.status.clone())))
            .collect()
    };
    assert_eq!(statuses(&first), statuses(&second));
}

// =============================================================================
// Binary
// =============================================================================

fn exrun(registry: &Path, work: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_exrun"));
    cmd.env_remove("EXRUN_CHECKER")
        .env_remove("EXRUN_TIMEOUT")
        .env_remove("EXRUN_EXAMPLE_DIR")
        .env_remove("EXRUN_INTERPRETER")
        .env_remove("RUST_LOG")
        .arg("--registry")
        .arg(registry)
        .arg("run")
        .arg("--work-dir")
        .arg(work.path());
    cmd
}

#[test]
fn test_binary_exit_codes() {
    let dir = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();

    let passing = dir.path().join("pass.list");
    fs::write(&passing, "native_examples = [('true', 'True', 'True')]\n").unwrap();
    let output = exrun(&passing, &work).output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("PASS: native true"));
    assert!(stdout.ends_with("RESULT: PASS\n"));

    let failing = dir.path().join("fail.list");
    fs::write(&failing, "native_examples = [('false', 'True', 'True')]\n").unwrap();
    let output = exrun(&failing, &work).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("RESULT: FAIL"));

    let invalid = dir.path().join("invalid.list");
    fs::write(&invalid, "native_examples = [('true', 'Perhaps', 'True')]\n").unwrap();
    let output = exrun(&invalid, &work).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_binary_json_report() {
    let dir = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let list = dir.path().join("mixed.list");
    fs::write(&list, "native_examples = [('true', 'True', 'True'), ('true', 'False', 'True')]\n").unwrap();

    let output = exrun(&list, &work).arg("--format").arg("json").output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doc["summary"]["attempted"], 1);
    assert_eq!(doc["summary"]["skipped"], 1);
    assert_eq!(doc["scenarios"][1]["status"], "skipped");
}
