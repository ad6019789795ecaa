// src/engine/core.rs

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::{CacheStore, GcReport, JobId, PipelineData};
use crate::config::Config;
use crate::engine::active::ActiveJobs;
use crate::engine::result::{ExecutionResult, Outcome, Submission};
use crate::engine::{EngineSettings, SubmitOptions};
use crate::errors::{Result, TabpipeError};
use crate::exec::{
    CancelSignal, EnvironmentRegistry, RunnerCommand, Supervisor, WorkerOutcome, render_error_text,
};
use crate::spec::PipelineSpec;
use crate::status::{FileStatusStore, STOPPED_EXTERNALLY, StatusSnapshot, StatusTracker};
use crate::types::JobState;

/// Operations slower than this are logged at `warn`.
const SLOW_OPERATION: Duration = Duration::from_millis(100);

const UNKNOWN_START_ERROR: &str = "There was an unknown error in starting the pipeline";

/// Runs pipeline specs through the external runner and reads back what
/// they produced.
///
/// Every submission gets its own job directory in the cache, its own
/// supervisor task, and its own cancel signal. The engine itself holds no
/// per-job state beyond the set of jobs in flight, so it is cheap to clone
/// and share.
#[derive(Debug, Clone)]
pub struct ExecutionEngine {
    cache: CacheStore,
    status: Arc<dyn StatusTracker>,
    environments: EnvironmentRegistry,
    settings: EngineSettings,
    active: ActiveJobs,
}

impl ExecutionEngine {
    pub fn new(
        cache: CacheStore,
        status: Arc<dyn StatusTracker>,
        environments: EnvironmentRegistry,
        settings: EngineSettings,
    ) -> Self {
        Self {
            cache,
            status,
            environments,
            settings,
            active: ActiveJobs::default(),
        }
    }

    /// Engine backed by a file status store inside the configured cache
    /// root.
    ///
    /// The root is made absolute because the runner runs from inside it and
    /// the derived spec names the results directory by path.
    pub fn from_config(config: &Config) -> Result<Self> {
        let root = std::path::absolute(&config.cache.root)?;
        let status = Arc::new(FileStatusStore::for_cache_root(&root));
        Ok(Self::new(
            CacheStore::new(root),
            status,
            EnvironmentRegistry::from_config(&config.runner),
            EngineSettings::from_config(config),
        ))
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Whether `job_id` is currently running in this engine.
    pub fn is_active(&self, job_id: &JobId) -> bool {
        self.active.contains(job_id)
    }

    /// Run `spec` as job `job_id` (generated when `None`).
    ///
    /// Only an invalid or in-flight job id, or a failure to set up the job
    /// directory, is returned as an error. Everything that goes wrong with
    /// the run itself comes back as a failed [`ExecutionResult`].
    ///
    /// Stale jobs in the cache root are garbage collected before returning,
    /// whatever the outcome.
    pub async fn submit(
        &self,
        spec: &PipelineSpec,
        job_id: Option<&str>,
        options: SubmitOptions,
    ) -> Result<Submission> {
        let job_id = JobId::parse_or_generate(job_id)?;
        let cancel = self.active.claim(&job_id)?;

        let submitted = self.launch(spec, &job_id, cancel, options).await;
        if let Err(e) = &submitted {
            warn!(job_id = %job_id, error = %e, "job could not be submitted");
            self.active.release(&job_id);
        }

        self.collect_garbage().await;
        submitted
    }

    async fn launch(
        &self,
        spec: &PipelineSpec,
        job_id: &JobId,
        cancel: CancelSignal,
        options: SubmitOptions,
    ) -> Result<Submission> {
        let spec_text = spec.to_yaml()?;
        log_state(job_id, JobState::Created);

        let started = Instant::now();
        self.cache.prepare(job_id)?;
        self.cache.write_specs(job_id, spec)?;
        warn_if_slow(started, job_id, "writing pipeline specs");
        log_state(job_id, JobState::SpecWritten);

        let environment = self.environments.resolve(&spec.version);
        debug!(
            job_id = %job_id,
            version = %spec.version,
            executable = %environment.executable,
            "resolved runner environment"
        );
        let mut command = RunnerCommand::new(
            environment,
            &spec.pipeline_id(job_id.as_str()),
            options.verbose,
            self.cache.root(),
        )
        .env(&self.settings.search_path_var, environment.processor_path.as_os_str());
        if let Some(dir) = self.status.runner_dir() {
            command = command.env(&self.settings.status_dir_var, dir.as_os_str());
        }
        if options.background {
            command = command.detached();
        }

        let previous_start = self.last_start_time(job_id);
        let handle = self.spawn_worker(job_id, command, cancel);
        log_state(job_id, JobState::Running);

        if options.background {
            return self.await_start(job_id, spec_text, previous_start, handle).await;
        }

        let outcome = handle
            .await
            .map_err(|e| TabpipeError::RunnerFailure(format!("worker for job {job_id} failed: {e}")))?;
        Ok(Submission::Finished(self.build_result(
            job_id,
            spec_text,
            previous_start,
            outcome,
            options,
        )))
    }

    fn spawn_worker(
        &self,
        job_id: &JobId,
        command: RunnerCommand,
        cancel: CancelSignal,
    ) -> JoinHandle<WorkerOutcome> {
        let supervisor = Supervisor {
            job_id: job_id.clone(),
            cache: self.cache.clone(),
            status: Arc::clone(&self.status),
            poll_interval: self.settings.poll_interval,
            kill_grace: self.settings.kill_grace,
        };
        let status = Arc::clone(&self.status);
        let active = self.active.clone();
        let job_id = job_id.clone();

        tokio::spawn(async move {
            let outcome = supervisor.run(command, cancel).await;
            active.release(&job_id);
            log_state(&job_id, terminal_state(status.as_ref(), &job_id, &outcome));
            outcome
        })
    }

    /// Wait until the runner records a new execution, or the worker ends
    /// without one.
    async fn await_start(
        &self,
        job_id: &JobId,
        spec_text: String,
        previous_start: Option<DateTime<Utc>>,
        handle: JoinHandle<WorkerOutcome>,
    ) -> Result<Submission> {
        let mut ticker = tokio::time::interval(self.settings.start_poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if self.has_new_start(job_id, previous_start) {
                info!(job_id = %job_id, "runner started; job continues in the background");
                return Ok(Submission::Started {
                    job_id: job_id.clone(),
                    spec_text,
                });
            }
            if !handle.is_finished() {
                continue;
            }
            // The runner may have recorded its start and exited between the
            // two checks above.
            if self.has_new_start(job_id, previous_start) {
                return Ok(Submission::Started {
                    job_id: job_id.clone(),
                    spec_text,
                });
            }

            let detail = match handle.await {
                Ok(WorkerOutcome::SpawnFailed(message)) => Some(message),
                Ok(WorkerOutcome::Exited { stderr_tail, .. }) if !stderr_tail.is_empty() => {
                    Some(stderr_tail.join("\n"))
                }
                Ok(_) => None,
                Err(e) => Some(e.to_string()),
            };
            let error_text = match detail {
                Some(detail) => format!("{UNKNOWN_START_ERROR}: {detail}"),
                None => UNKNOWN_START_ERROR.to_string(),
            };
            warn!(job_id = %job_id, "runner ended without recording a start");
            return Ok(Submission::Finished(ExecutionResult::failure(
                job_id.clone(),
                spec_text,
                error_text,
            )));
        }
    }

    fn build_result(
        &self,
        job_id: &JobId,
        spec_text: String,
        previous_start: Option<DateTime<Utc>>,
        outcome: WorkerOutcome,
        options: SubmitOptions,
    ) -> ExecutionResult {
        let (code, stderr_tail) = match outcome {
            WorkerOutcome::Cancelled => {
                return ExecutionResult::failure(job_id.clone(), spec_text, STOPPED_EXTERNALLY);
            }
            WorkerOutcome::SpawnFailed(message) => {
                return ExecutionResult::failure(
                    job_id.clone(),
                    spec_text,
                    format!("{UNKNOWN_START_ERROR}: {message}"),
                );
            }
            WorkerOutcome::Exited { code, stderr_tail } => (code, stderr_tail),
        };

        let record = match self.status.last_execution(job_id) {
            Ok(record) => record.filter(|r| Some(r.start_time) != previous_start),
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "failed to read execution status");
                None
            }
        };

        let Some(record) = record else {
            return ExecutionResult::failure(
                job_id.clone(),
                spec_text,
                format!("{UNKNOWN_START_ERROR}: {}", exit_summary(code, &stderr_tail, options.verbose)),
            );
        };

        if record.success == Some(true) {
            return self.read_success(job_id, spec_text, options.limit_rows);
        }

        let error_text = if record.error_log.is_empty() {
            exit_summary(code, &stderr_tail, options.verbose)
        } else {
            render_error_text(&record.error_log, options.verbose)
        };
        ExecutionResult::failure(job_id.clone(), spec_text, error_text)
    }

    fn read_success(&self, job_id: &JobId, spec_text: String, limit_rows: i64) -> ExecutionResult {
        let started = Instant::now();
        let data = self.cache.read_results(job_id, limit_rows);
        warn_if_slow(started, job_id, "reading results");

        match data {
            Ok(data) => ExecutionResult {
                job_id: job_id.clone(),
                spec_text,
                outcome: Outcome::Success {
                    dataset_metadata: data.dataset_metadata,
                    resources: data.resources,
                },
            },
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "failed to read results of a successful run");
                ExecutionResult::failure(job_id.clone(), spec_text, e.to_string())
            }
        }
    }

    fn last_start_time(&self, job_id: &JobId) -> Option<DateTime<Utc>> {
        match self.status.last_execution(job_id) {
            Ok(record) => record.map(|r| r.start_time),
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "ignoring unreadable execution status");
                None
            }
        }
    }

    fn has_new_start(&self, job_id: &JobId, previous_start: Option<DateTime<Utc>>) -> bool {
        match self.status.last_execution(job_id) {
            Ok(Some(record)) => Some(record.start_time) != previous_start,
            Ok(None) => false,
            Err(e) => {
                debug!(job_id = %job_id, error = %e, "execution status not readable yet");
                false
            }
        }
    }

    /// Last execution of `job_id` as recorded by the runner. Read only.
    pub fn get_status(&self, job_id: &str) -> Result<StatusSnapshot> {
        let job_id = JobId::parse(job_id)?;
        let record = self.status.last_execution(&job_id)?;
        Ok(StatusSnapshot::from_record(job_id, record))
    }

    /// Dataset metadata and resources of `job_id`, at most `limit_rows`
    /// rows per resource (all when negative).
    pub fn get_data(&self, job_id: &str, limit_rows: i64) -> Result<PipelineData> {
        let job_id = JobId::parse(job_id)?;
        self.cache.read_results(&job_id, limit_rows)
    }

    /// Remove the job directory of `job_id`.
    pub fn delete_pipeline_data(&self, job_id: &str) -> Result<()> {
        let job_id = JobId::parse(job_id)?;
        self.cache.delete(&job_id)?;
        info!(job_id = %job_id, "pipeline data deleted");
        Ok(())
    }

    /// Ask `job_id` to stop.
    ///
    /// The derived spec is removed first, so a job running in another
    /// process sees the same request on its next poll. Returns whether
    /// there was anything to cancel.
    pub fn cancel(&self, job_id: &str) -> Result<bool> {
        let job_id = JobId::parse(job_id)?;
        let removed = self.cache.remove_spec(&job_id)?;
        let signalled = match self.active.get(&job_id) {
            Some(signal) => {
                signal.trigger();
                true
            }
            None => false,
        };
        info!(job_id = %job_id, removed, signalled, "cancel requested");
        Ok(removed || signalled)
    }

    /// Sweep the cache root on a blocking thread. Never fails.
    pub async fn collect_garbage(&self) -> GcReport {
        let cache = self.cache.clone();
        let retention = self.settings.retention;
        let started = Instant::now();

        let report = match tokio::task::spawn_blocking(move || cache.collect_garbage(retention)).await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "garbage collection task failed");
                GcReport::default()
            }
        };

        let elapsed = started.elapsed();
        if elapsed > SLOW_OPERATION {
            warn!(elapsed_ms = elapsed.as_millis() as u64, "slow garbage collection");
        }
        report
    }
}

fn terminal_state(status: &dyn StatusTracker, job_id: &JobId, outcome: &WorkerOutcome) -> JobState {
    match outcome {
        WorkerOutcome::Cancelled => JobState::Cancelled,
        WorkerOutcome::SpawnFailed(_) => JobState::Failed,
        WorkerOutcome::Exited { .. } => match status.last_execution(job_id) {
            Ok(Some(record)) if record.success == Some(true) => JobState::Succeeded,
            _ => JobState::Failed,
        },
    }
}

fn log_state(job_id: &JobId, state: JobState) {
    if state.is_terminal() {
        info!(job_id = %job_id, %state, "job finished");
    } else {
        debug!(job_id = %job_id, %state, "job state changed");
    }
}

fn warn_if_slow(started: Instant, job_id: &JobId, operation: &str) {
    let elapsed = started.elapsed();
    if elapsed > SLOW_OPERATION {
        warn!(
            job_id = %job_id,
            operation,
            elapsed_ms = elapsed.as_millis() as u64,
            "slow operation"
        );
    }
}

fn exit_summary(code: Option<i32>, stderr_tail: &[String], verbose: bool) -> String {
    if !stderr_tail.is_empty() {
        return render_error_text(stderr_tail, verbose);
    }
    match code {
        Some(code) => format!("runner exited with code {code}"),
        None => "runner was terminated by a signal".to_string(),
    }
}
