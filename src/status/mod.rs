// src/status/mod.rs

//! Execution status of jobs, as recorded by the external runner.
//!
//! The runner writes one record per job when an execution starts and again
//! when it finishes. The engine only reads these records, except on the
//! cancellation path where it closes out an execution the runner never got
//! to finish.

pub mod file_store;

use std::fmt::Debug;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::JobId;
use crate::errors::Result;

pub use file_store::FileStatusStore;

/// Error log entry written when a job is cancelled from outside.
pub const STOPPED_EXTERNALLY: &str = "stopped externally";

/// The most recent execution of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub finish_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error_log: Vec<String>,
}

impl ExecutionRecord {
    pub fn started(start_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            finish_time: None,
            success: None,
            error_log: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.finish_time.is_some() || self.success.is_some()
    }
}

/// Coarse state derived from the last execution record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// What `getStatus` reports for a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub job_id: JobId,
    pub status: RunState,
    pub start_time: Option<DateTime<Utc>>,
    pub finish_time: Option<DateTime<Utc>>,
    pub success: Option<bool>,
    pub error_log: Option<Vec<String>>,
}

impl StatusSnapshot {
    pub fn from_record(job_id: JobId, record: Option<ExecutionRecord>) -> Self {
        match record {
            None => Self {
                job_id,
                status: RunState::Idle,
                start_time: None,
                finish_time: None,
                success: None,
                error_log: None,
            },
            Some(record) => {
                let status = match record.success {
                    Some(true) => RunState::Succeeded,
                    Some(false) => RunState::Failed,
                    None if record.finish_time.is_some() => RunState::Failed,
                    None => RunState::Running,
                };
                Self {
                    job_id,
                    status,
                    start_time: Some(record.start_time),
                    finish_time: record.finish_time,
                    success: record.success,
                    error_log: Some(record.error_log),
                }
            }
        }
    }
}

/// Keyed access to execution records.
pub trait StatusTracker: Send + Sync + Debug {
    /// The most recent execution of `job_id`, if any.
    fn last_execution(&self, job_id: &JobId) -> Result<Option<ExecutionRecord>>;

    /// Close out the current execution as finished.
    ///
    /// Does nothing and returns `false` when the last execution is already
    /// terminal. When no record exists one is created, so the job always
    /// ends up with a terminal record.
    fn finish_execution(&self, job_id: &JobId, success: bool, error_log: Vec<String>)
        -> Result<bool>;

    /// Directory the runner should write records into, if file backed.
    fn runner_dir(&self) -> Option<&Path> {
        None
    }
}
