// src/status/file_store.rs

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use tracing::debug;

use crate::cache::JobId;
use crate::errors::Result;
use crate::status::{ExecutionRecord, StatusTracker};

/// Name of the status directory inside the cache root.
///
/// Hidden, so cache garbage collection never removes it.
pub const STATUS_DIR: &str = ".status";

/// Status records stored as `{dir}/{job_id}.json`.
#[derive(Debug, Clone)]
pub struct FileStatusStore {
    dir: PathBuf,
}

impl FileStatusStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store living next to the jobs in `cache_root`.
    pub fn for_cache_root(cache_root: &Path) -> Self {
        Self::new(cache_root.join(STATUS_DIR))
    }

    pub fn record_path(&self, job_id: &JobId) -> PathBuf {
        self.dir.join(format!("{}.json", job_id))
    }

    /// Replace the record for `job_id` (temp file + rename).
    pub fn write_record(&self, job_id: &JobId, record: &ExecutionRecord) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating status directory {:?}", self.dir))?;
        let path = self.record_path(job_id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(record)?)
            .with_context(|| format!("writing {:?}", tmp))?;
        fs::rename(&tmp, &path).with_context(|| format!("renaming {:?} to {:?}", tmp, path))?;
        Ok(())
    }
}

impl StatusTracker for FileStatusStore {
    fn last_execution(&self, job_id: &JobId) -> Result<Option<ExecutionRecord>> {
        let path = self.record_path(job_id);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        // The runner may be rewriting the record; an empty file reads as
        // "nothing recorded yet".
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    }

    fn finish_execution(
        &self,
        job_id: &JobId,
        success: bool,
        error_log: Vec<String>,
    ) -> Result<bool> {
        let now = Utc::now();
        let mut record = match self.last_execution(job_id)? {
            Some(record) if record.is_terminal() => {
                debug!(job_id = %job_id, "last execution already terminal; leaving it");
                return Ok(false);
            }
            Some(record) => record,
            None => ExecutionRecord::started(now),
        };
        record.finish_time = Some(now);
        record.success = Some(success);
        record.error_log = error_log;
        self.write_record(job_id, &record)?;
        Ok(true)
    }

    fn runner_dir(&self) -> Option<&Path> {
        Some(&self.dir)
    }
}
