// src/engine/active.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::cache::JobId;
use crate::errors::{Result, TabpipeError};
use crate::exec::CancelSignal;

/// Jobs currently running in this engine, keyed by id, each with the
/// signal that cancels it.
///
/// Claiming an id that is already present fails, so two submissions can
/// never share a job directory inside one process.
#[derive(Debug, Clone, Default)]
pub struct ActiveJobs {
    inner: Arc<Mutex<HashMap<JobId, CancelSignal>>>,
}

impl ActiveJobs {
    pub fn claim(&self, job_id: &JobId) -> Result<CancelSignal> {
        let mut jobs = self.lock();
        if jobs.contains_key(job_id) {
            return Err(TabpipeError::JobInFlight(job_id.to_string()));
        }
        let signal = CancelSignal::new();
        jobs.insert(job_id.clone(), signal.clone());
        Ok(signal)
    }

    pub fn release(&self, job_id: &JobId) -> bool {
        self.lock().remove(job_id).is_some()
    }

    pub fn get(&self, job_id: &JobId) -> Option<CancelSignal> {
        self.lock().get(job_id).cloned()
    }

    pub fn contains(&self, job_id: &JobId) -> bool {
        self.lock().contains_key(job_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, CancelSignal>> {
        // The map is consistent after every operation, so a poisoned lock
        // is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
