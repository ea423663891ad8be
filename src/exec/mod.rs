// src/exec/mod.rs

//! Task execution layer for the watch loop.
//!
//! - [`backend`] provides the `ExecutorBackend` trait and the production
//!   `RegistryExecutor`, which tests can replace with a fake.
//! - [`task_runner`] runs one task and reports its outcome back to the
//!   runtime as a `RuntimeEvent`.

pub mod backend;
pub mod task_runner;

pub use backend::{ExecutorBackend, RegistryExecutor};
pub use task_runner::run_and_report;
