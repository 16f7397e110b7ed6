//! Result aggregation and reporting.
//!
//! [`summarize`] is a pure fold over the per-scenario results; reporters only render. The console
//! report is line-oriented and stable so CI logs can be diffed and grepped:
//!
//! ```text
//! PASS: native lena-simple (0.520s)
//! PASS: native lena-simple [checker] (3.100s)
//! FAIL: native lena-fading --simTime=0.1 (exit code 1, 0.010s)
//! SKIP: native lena-ipv6-addr-conf (run condition false)
//!
//! totals: attempted=2 passed=1 failed=1 skipped=1
//! checker: attempted=1 passed=1 failed=0
//! RESULT: FAIL
//! ```

use std::io::{self, Write};

use serde_json::{Value, json};

use super::result::{ExecutionResult, RunRecord, RunStatus};

/// Aggregate over every result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    /// Scenarios that made it through the filters and were dispatched.
    pub selected: usize,
    pub attempted: usize,
    /// Attempted scenarios whose plain run passed and whose checker run, if any, passed too.
    pub passed: usize,
    pub failed: usize,
    /// Run condition false.
    pub skipped: usize,
    pub checker_attempted: usize,
    pub checker_passed: usize,
    pub checker_failed: usize,
    /// Every attempted run, checker runs included, passed.
    pub success: bool,
}

/// Fold results into a [`Summary`]. Order-independent.
pub fn summarize(results: &[ExecutionResult]) -> Summary {
    let mut summary = Summary {
        selected: results.len(),
        success: true,
        ..Summary::default()
    };

    for result in results {
        if !result.attempted() {
            summary.skipped += 1;
            continue;
        }
        summary.attempted += 1;
        if result.failed() {
            summary.failed += 1;
            summary.success = false;
        } else {
            summary.passed += 1;
        }
        if result.checker_attempted() {
            summary.checker_attempted += 1;
            if result.checker_passed() {
                summary.checker_passed += 1;
            } else {
                summary.checker_failed += 1;
            }
        }
    }

    summary
}

// ============================================================================
// Reporter Interface
// ============================================================================

/// Observer of a harness run.
///
/// `on_result` fires in completion order while the run is in flight; `on_run_complete` fires once,
/// after every dispatched scenario has terminated, with the results in registry order.
pub trait Reporter {
    /// Called once the selection is known, before anything is launched.
    fn on_run_start(&mut self, _selected: usize) -> io::Result<()> {
        Ok(())
    }

    /// Called as each scenario finishes.
    fn on_result(&mut self, _result: &ExecutionResult) -> io::Result<()> {
        Ok(())
    }

    /// Called with the final, ordered results.
    fn on_run_complete(&mut self, results: &[ExecutionResult], summary: &Summary) -> io::Result<()>;
}

// ============================================================================
// Console Reporter
// ============================================================================

/// Plain-text report.
pub struct ConsoleReporter<W> {
    out: W,
    verbose: bool,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, verbose: bool) -> Self {
        Self { out, verbose }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn on_run_start(&mut self, selected: usize) -> io::Result<()> {
        if selected == 0 {
            writeln!(self.out, "no scenarios selected")?;
        }
        Ok(())
    }

    fn on_run_complete(&mut self, results: &[ExecutionResult], summary: &Summary) -> io::Result<()> {
        self.out.write_all(render_text(results, summary, self.verbose).as_bytes())?;
        self.out.flush()
    }
}

/// Render the full text report.
pub fn render_text(results: &[ExecutionResult], summary: &Summary, verbose: bool) -> String {
    let mut text = String::new();

    for result in results {
        let label = format!("{} {}", result.category, result.invocation);
        match &result.plain {
            None => text.push_str(&format!("SKIP: {} (run condition false)\n", label)),
            Some(record) => {
                push_run_line(&mut text, &label, record, verbose);
                if let Some(checker) = &result.checker {
                    push_run_line(&mut text, &format!("{} [checker]", label), checker, verbose);
                }
            }
        }
    }

    if !results.is_empty() {
        text.push('\n');
    }
    text.push_str(&format!(
        "totals: attempted={} passed={} failed={} skipped={}\n",
        summary.attempted, summary.passed, summary.failed, summary.skipped
    ));
    if summary.checker_attempted > 0 {
        text.push_str(&format!(
            "checker: attempted={} passed={} failed={}\n",
            summary.checker_attempted, summary.checker_passed, summary.checker_failed
        ));
    }
    text.push_str(if summary.success { "RESULT: PASS\n" } else { "RESULT: FAIL\n" });
    text
}

fn push_run_line(text: &mut String, label: &str, record: &RunRecord, verbose: bool) {
    let secs = record.duration.as_secs_f64();
    match record.failure_reason() {
        None => text.push_str(&format!("PASS: {} ({:.3}s)\n", label, secs)),
        Some(reason) => {
            text.push_str(&format!("FAIL: {} ({}, {:.3}s)\n", label, reason, secs));
            if verbose {
                push_captured(text, "stdout", &record.stdout);
                push_captured(text, "stderr", &record.stderr);
            }
        }
    }
}

fn push_captured(text: &mut String, stream: &str, captured: &str) {
    if captured.trim().is_empty() {
        return;
    }
    text.push_str(&format!("  --- {} ---\n", stream));
    for line in captured.lines() {
        text.push_str("  ");
        text.push_str(line);
        text.push('\n');
    }
}

// ============================================================================
// JSON Reporter
// ============================================================================

/// Single JSON document on completion, for CI tooling.
pub struct JsonReporter<W> {
    out: W,
    /// Include captured output of every attempted run.
    include_output: bool,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W, include_output: bool) -> Self {
        Self { out, include_output }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn on_run_complete(&mut self, results: &[ExecutionResult], summary: &Summary) -> io::Result<()> {
        let document = render_json(results, summary, self.include_output);
        serde_json::to_writer_pretty(&mut self.out, &document)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

/// Build the JSON report document.
pub fn render_json(results: &[ExecutionResult], summary: &Summary, include_output: bool) -> Value {
    let scenarios: Vec<Value> = results
        .iter()
        .map(|result| {
            let status = if !result.attempted() {
                "skipped"
            } else if result.failed() {
                "failed"
            } else {
                "passed"
            };
            json!({
                "id": result.id.0,
                "category": result.category.as_str(),
                "invocation": result.invocation.as_str(),
                "status": status,
                "run": result.plain.as_ref().map(|r| record_json(r, include_output)),
                "checker": result.checker.as_ref().map(|r| record_json(r, include_output)),
            })
        })
        .collect();

    json!({
        "summary": {
            "selected": summary.selected,
            "attempted": summary.attempted,
            "passed": summary.passed,
            "failed": summary.failed,
            "skipped": summary.skipped,
            "checker_attempted": summary.checker_attempted,
            "checker_passed": summary.checker_passed,
            "checker_failed": summary.checker_failed,
            "success": summary.success,
        },
        "scenarios": scenarios,
    })
}

fn record_json(record: &RunRecord, include_output: bool) -> Value {
    let status = match record.status {
        RunStatus::Passed => "passed",
        RunStatus::Failed(_) => "failed",
        RunStatus::Signaled => "signaled",
        RunStatus::TimedOut(_) => "timed_out",
        RunStatus::LaunchFailed(_) => "launch_failed",
    };
    let mut value = json!({
        "status": status,
        "exit_code": record.exit_code(),
        "duration_secs": record.duration.as_secs_f64(),
        "reason": record.failure_reason(),
    });
    if include_output {
        if let Value::Object(map) = &mut value {
            map.insert("stdout".to_string(), Value::String(record.stdout.clone()));
            map.insert("stderr".to_string(), Value::String(record.stderr.clone()));
        }
    }
    value
}
