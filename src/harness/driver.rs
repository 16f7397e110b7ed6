//! Execution driver: runs one scenario as external processes.
//!
//! ## Launcher Trait
//!
//! Process creation sits behind the [`Launcher`] trait so the driver's decision logic (conditions,
//! checker wrapping, failure classification) can be exercised without spawning anything.
//! [`ProcessLauncher`] is the production implementation on top of `tokio::process`.
//!
//! ## Failure classification
//!
//! - exit code 0: pass
//! - non-zero exit, signal, timeout: scenario failure
//! - executable missing / not permitted / not executable: scenario failure
//! - fork exhaustion (`WouldBlock`, `OutOfMemory`) and work-dir setup: infrastructure failure,
//!   which aborts the whole run

use std::ffi::OsString;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use exrun_registry::{Category, Scenario};
#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{Signal, killpg};
#[cfg(unix)]
use nix::unistd::Pid;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::HarnessError;
use super::condition::{should_run, should_run_checker};
use super::options::RunOptions;
use super::result::{ExecutionResult, RunRecord, RunStatus};

/// How long output readers may keep draining after the child's process group has been killed.
///
/// Only a process that left the group (`setsid`) can still hold the pipes open at that point;
/// past this grace period whatever was captured so far is kept and the reader is abandoned.
const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(2);

// ============================================================================
// Launcher Interface
// ============================================================================

/// One process to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// Working directory; `None` inherits the harness's.
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
}

impl LaunchRequest {
    /// Program and arguments as one display string.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// How a launched process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Exited(i32),
    Signaled,
    TimedOut,
}

/// What a launcher observed about a process it started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub termination: Termination,
    pub duration: Duration,
    pub stdout: String,
    pub stderr: String,
}

/// Errors that prevent a process from being observed at all.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The scenario's program could not be started; recorded as a scenario failure.
    #[error("cannot launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The harness itself cannot create or wait on processes; fatal for the run.
    #[error("process infrastructure failure for `{program}`: {source}")]
    Infrastructure {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    /// Classify a spawn error.
    pub fn from_spawn(program: &Path, source: io::Error) -> Self {
        let program = program.display().to_string();
        match source.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::OutOfMemory => LaunchError::Infrastructure { program, source },
            _ => LaunchError::Spawn { program, source },
        }
    }
}

/// Starts a process, waits for it (bounded by the request's timeout) and reports the outcome.
pub trait Launcher: Send + Sync + 'static {
    fn launch(&self, request: LaunchRequest) -> impl Future<Output = Result<ProcessOutcome, LaunchError>> + Send;
}

// ============================================================================
// Process Launcher (tokio)
// ============================================================================

/// Launches real child processes.
///
/// On unix every child leads its own process group. Once the child has exited, timed out or been
/// abandoned (run cancellation drops the launch future), the whole group is sent `SIGKILL`, so
/// programs the scenario backgrounded go down with it and cannot keep the output pipes open.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    async fn launch(&self, request: LaunchRequest) -> Result<ProcessOutcome, LaunchError> {
        let start = Instant::now();

        let mut command = Command::new(&request.program);
        command
            .args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);
        if let Some(cwd) = &request.cwd {
            command.current_dir(cwd);
        }

        debug!(command = %request.command_line(), "launching");
        let mut child = command
            .spawn()
            .map_err(|e| LaunchError::from_spawn(&request.program, e))?;
        let mut group = ProcessGroup::new(child.id());

        let stdout = tokio::spawn(read_pipe(child.stdout.take()));
        let stderr = tokio::spawn(read_pipe(child.stderr.take()));

        let termination = match tokio::time::timeout(request.timeout, child.wait()).await {
            Ok(Ok(status)) => match status.code() {
                Some(code) => Termination::Exited(code),
                None => Termination::Signaled,
            },
            Ok(Err(source)) => {
                return Err(LaunchError::Infrastructure {
                    program: request.program.display().to_string(),
                    source,
                });
            }
            Err(_) => {
                warn!(
                    command = %request.command_line(),
                    timeout_secs = request.timeout.as_secs_f64(),
                    "timed out, killing"
                );
                group.kill();
                // kill() also reaps the child
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "failed to kill timed-out process");
                }
                Termination::TimedOut
            }
        };
        let duration = start.elapsed();

        // Leftover background processes would hold the pipes open
        group.kill();
        let (stdout, stderr) = tokio::join!(drain(stdout), drain(stderr));

        Ok(ProcessOutcome {
            termination,
            duration,
            stdout,
            stderr,
        })
    }
}

/// The process group led by a launched child. Killed at most once, and on drop.
#[derive(Debug)]
struct ProcessGroup {
    #[cfg(unix)]
    pgid: Option<Pid>,
}

impl ProcessGroup {
    #[cfg(unix)]
    fn new(leader: Option<u32>) -> Self {
        Self {
            pgid: leader.and_then(|pid| i32::try_from(pid).ok()).map(Pid::from_raw),
        }
    }

    #[cfg(not(unix))]
    fn new(_leader: Option<u32>) -> Self {
        Self {}
    }

    /// Send `SIGKILL` to every process still in the group.
    #[cfg(unix)]
    fn kill(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };
        match killpg(pgid, Signal::SIGKILL) {
            // Group already empty
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => warn!(pgid = pgid.as_raw(), error = %e, "failed to kill process group"),
        }
    }

    #[cfg(not(unix))]
    fn kill(&mut self) {}
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

async fn read_pipe<R>(pipe: Option<R>) -> Vec<u8>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        // Partial output is still useful if the read fails midway
        let _ = pipe.read_to_end(&mut buf).await;
    }
    buf
}

async fn drain(mut reader: JoinHandle<Vec<u8>>) -> String {
    match tokio::time::timeout(PIPE_DRAIN_GRACE, &mut reader).await {
        Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
        Ok(Err(_)) => String::new(),
        Err(_) => {
            reader.abort();
            String::new()
        }
    }
}

// ============================================================================
// Execution Driver
// ============================================================================

/// Runs single scenarios: plain run, then the optional checker run.
pub struct ExecutionDriver<L> {
    launcher: Arc<L>,
    options: Arc<RunOptions>,
}

impl<L: Launcher> ExecutionDriver<L> {
    pub fn new(launcher: Arc<L>, options: Arc<RunOptions>) -> Self {
        Self { launcher, options }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Run one scenario.
    ///
    /// ## Errors
    /// Only infrastructure failures are returned as errors. Every scenario-level failure (non-zero
    /// exit, timeout, missing executable) is recorded in the returned [`ExecutionResult`].
    pub async fn run(&self, scenario: &Scenario) -> Result<ExecutionResult, HarnessError> {
        if !should_run(scenario, &self.options) {
            debug!(scenario = %scenario.invocation, "run condition false, skipping");
            return Ok(ExecutionResult::skipped(scenario));
        }

        let cwd = self.prepare_work_dir(scenario).await?;
        let (program, args) = self.resolve(scenario);

        let plain_request = LaunchRequest {
            program: program.clone(),
            args: args.clone(),
            cwd: cwd.clone(),
            timeout: self.options.timeout,
        };
        let plain = self.attempt(plain_request).await?;

        let checker = if should_run_checker(scenario, &self.options) {
            let mut checker_args: Vec<OsString> = self
                .options
                .checker
                .launcher_args()
                .into_iter()
                .map(OsString::from)
                .collect();
            checker_args.push(program.into_os_string());
            checker_args.extend(args);

            let checker_request = LaunchRequest {
                program: PathBuf::from(&self.options.checker.program),
                args: checker_args,
                cwd,
                timeout: self.options.timeout,
            };
            Some(self.attempt(checker_request).await?)
        } else {
            None
        };

        Ok(ExecutionResult {
            id: scenario.id,
            category: scenario.category,
            invocation: scenario.invocation.clone(),
            plain: Some(plain),
            checker,
        })
    }

    async fn attempt(&self, request: LaunchRequest) -> Result<RunRecord, HarnessError> {
        let start = Instant::now();
        let timeout = request.timeout;
        match self.launcher.launch(request).await {
            Ok(outcome) => Ok(RunRecord {
                status: match outcome.termination {
                    Termination::Exited(0) => RunStatus::Passed,
                    Termination::Exited(code) => RunStatus::Failed(code),
                    Termination::Signaled => RunStatus::Signaled,
                    Termination::TimedOut => RunStatus::TimedOut(timeout),
                },
                duration: outcome.duration,
                stdout: outcome.stdout,
                stderr: outcome.stderr,
            }),
            Err(LaunchError::Spawn { program, source }) => {
                warn!(program = %program, error = %source, "launch failed");
                Ok(RunRecord::launch_failed(source.to_string(), start.elapsed()))
            }
            Err(err @ LaunchError::Infrastructure { .. }) => Err(HarnessError::Infrastructure(err.to_string())),
        }
    }

    /// Program and argument list for the plain run.
    fn resolve(&self, scenario: &Scenario) -> (PathBuf, Vec<OsString>) {
        let invocation = &scenario.invocation;
        let args = invocation.args().map(OsString::from);
        match scenario.category {
            Category::Native => (
                resolve_program(invocation.program(), self.options.example_dir.as_deref()),
                args.collect(),
            ),
            Category::Scripted => {
                let script = resolve_script(invocation.program(), self.options.script_dir.as_deref());
                let mut all = vec![script.into_os_string()];
                all.extend(args);
                (PathBuf::from(&self.options.interpreter), all)
            }
        }
    }

    async fn prepare_work_dir(&self, scenario: &Scenario) -> Result<Option<PathBuf>, HarnessError> {
        if !self.options.isolate {
            return Ok(None);
        }
        let dir = work_dir_for(&self.options.work_root, scenario);
        // Start from an empty directory so files from an earlier run cannot leak into this one
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(HarnessError::Infrastructure(format!(
                    "cannot clear work directory '{}': {}",
                    dir.display(),
                    e
                )));
            }
        }
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            HarnessError::Infrastructure(format!("cannot create work directory '{}': {}", dir.display(), e))
        })?;
        Ok(Some(dir))
    }
}

/// Per-scenario work directory under `root`.
pub fn work_dir_for(root: &Path, scenario: &Scenario) -> PathBuf {
    let dir = root.join(format!("{:04}-{}", scenario.id.0, scenario.invocation.slug()));
    absolutize(&dir)
}

/// Resolve a native program name.
///
/// Bare names are joined onto `base` when given, otherwise left for PATH lookup. Anything with a
/// path separator is made absolute, since children run in their own work directory.
fn resolve_program(name: &str, base: Option<&Path>) -> PathBuf {
    let path = Path::new(name);
    let bare = path.components().count() == 1 && !path.is_absolute();
    match (bare, base) {
        (true, Some(base)) => absolutize(&base.join(path)),
        (true, None) => path.to_path_buf(),
        (false, _) => absolutize(path),
    }
}

/// Resolve a script path. Interpreters never search PATH, so the result is always absolute.
fn resolve_script(name: &str, base: Option<&Path>) -> PathBuf {
    let path = Path::new(name);
    match base {
        Some(base) if path.is_relative() => absolutize(&base.join(path)),
        _ => absolutize(path),
    }
}

fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
