// src/engine/mod.rs

//! Job orchestration for tabpipe.
//!
//! This module ties together:
//! - the on-disk job cache (spec files, results, garbage collection)
//! - the status store written by the external runner
//! - the per-job supervisor that owns the runner process
//!
//! [`ExecutionEngine`] is the entry point; [`result`] holds what it returns.

use std::time::Duration;

use crate::config::Config;

/// Interval at which a background submission checks whether the runner
/// has recorded its start.
pub const START_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Per-submission options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOptions {
    /// Pass `--verbose` to the runner and keep its full error log.
    pub verbose: bool,
    /// Return once the runner has started instead of when it finishes.
    pub background: bool,
    /// Rows per resource in the result; negative means all rows.
    pub limit_rows: i64,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            background: false,
            limit_rows: -1,
        }
    }
}

/// Engine-wide knobs, usually taken from [`Config`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub search_path_var: String,
    pub status_dir_var: String,
    pub poll_interval: Duration,
    pub kill_grace: Duration,
    pub retention: Duration,
    pub start_poll: Duration,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            search_path_var: config.runner.search_path_var.clone(),
            status_dir_var: config.runner.status_dir_var.clone(),
            poll_interval: config.runner.poll_interval,
            kill_grace: config.runner.kill_grace,
            retention: config.cache.retention,
            start_poll: START_POLL_INTERVAL,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

pub mod active;
pub mod core;
pub mod result;

pub use active::ActiveJobs;
pub use self::core::ExecutionEngine;
pub use result::{ExecutionResult, Outcome, Submission};
