// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the external pipeline
//! runner, using `tokio::process::Command`, and watching it until it exits
//! or is cancelled.
//!
//! - [`environment`] resolves a pipeline version to a runner executable and
//!   builds the launch command.
//! - [`supervisor`] owns a running runner process (polling, cancellation,
//!   cleanup).
//! - [`cancel`] is the cancellation token a supervisor listens on.
//! - [`process_group`] signals a runner together with its descendants.
//! - [`error_log`] trims runner logs for display.

pub mod cancel;
pub mod environment;
pub mod error_log;
pub mod process_group;
pub mod supervisor;

pub use cancel::{CancelListener, CancelSignal};
pub use environment::{EnvironmentRegistry, RunnerCommand, RunnerEnvironment};
pub use error_log::{render_error_text, trim_error_log};
pub use process_group::ProcessGroup;
pub use supervisor::{Supervisor, WorkerOutcome};
