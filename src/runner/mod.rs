//! Asynchronous command execution with a persisted lifecycle.
//!
//! # Components
//!
//! - [`JobRunner`]: submission, background execution and status reads
//! - [`CommandExecutor`]: spawns `<shell> -c <command>` and captures output
//! - [`Task`]: the persisted record and its state machine
//!
//! # Lifecycle
//!
//! 1. [`JobRunner::submit`] stores the task as `Received` and returns
//! 2. A spawned tokio task moves it to `Running` and persists that
//! 3. The command runs to completion
//! 4. The task becomes `Finished` (with stdout) or `Error`
//!
//! `Finished` and `Error` are terminal. There is no retry.

pub mod executor;
pub mod job_runner;
pub mod task;

pub use executor::CommandExecutor;
pub use job_runner::{JobRunner, RecoveryReport};
pub use task::{Task, TaskStatus};
