#![forbid(unsafe_code)]
//! exrun: regression harness for simulation example programs.
//!
//! exrun runs a registry of example invocations (see [`exrun_registry`]) as external processes,
//! optionally repeats eligible ones under a memory checker, and reports a deterministic summary whose
//! exit status tells automated callers whether every attempted example still works.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` and `harness` modules
//!   enforce `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod harness;
pub mod version;

pub use exrun_registry as registry;

pub use harness::{
    ExecutionDriver, ExecutionResult, HarnessError, Launcher, ProcessLauncher, Reporter, RunOptions, Summary, run_all,
    summarize,
};
