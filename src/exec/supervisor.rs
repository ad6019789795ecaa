// src/exec/supervisor.rs

//! Background worker that owns one runner process from spawn to exit.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, timeout};
use tracing::{debug, error, info, warn};

use crate::cache::{CacheStore, JobId};
use crate::exec::cancel::{CancelListener, CancelSignal};
use crate::exec::environment::RunnerCommand;
use crate::exec::process_group::ProcessGroup;
use crate::status::{STOPPED_EXTERNALLY, StatusTracker};

/// Number of trailing stderr lines kept for error reporting.
const STDERR_TAIL: usize = 50;
const STDERR_DRAIN: Duration = Duration::from_millis(500);

type StderrTail = Arc<Mutex<VecDeque<String>>>;

/// How a worker ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// The runner exited on its own. The status store, not the exit code,
    /// says whether the run succeeded.
    Exited {
        code: Option<i32>,
        stderr_tail: Vec<String>,
    },
    /// The run was cancelled and the runner's process group terminated.
    Cancelled,
    /// The runner could not be started at all.
    SpawnFailed(String),
}

/// Supervises one runner process.
///
/// Every `poll_interval` the worker checks that the job's derived spec is
/// still on disk; if it has been deleted the cancel signal is triggered.
/// Whatever triggers the signal, cancellation terminates the runner's whole
/// process group, closes out the status record, force-kills after
/// `kill_grace`, and finally removes the job directory.
#[derive(Debug, Clone)]
pub struct Supervisor {
    pub job_id: JobId,
    pub cache: CacheStore,
    pub status: Arc<dyn StatusTracker>,
    pub poll_interval: Duration,
    pub kill_grace: Duration,
}

impl Supervisor {
    pub async fn run(self, command: RunnerCommand, cancel: CancelSignal) -> WorkerOutcome {
        let outcome = match self.run_inner(&command, &cancel).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(job_id = %self.job_id, error = %err, "runner execution error");
                WorkerOutcome::SpawnFailed(format!("{err:#}"))
            }
        };

        // A deleted spec means the caller no longer wants any of this job's
        // artifacts, even if the runner happened to finish first.
        if outcome == WorkerOutcome::Cancelled || !self.cache.spec_exists(&self.job_id) {
            match self.cache.delete_if_exists(&self.job_id) {
                Ok(true) => info!(job_id = %self.job_id, "removed job directory of cancelled job"),
                Ok(false) => {}
                Err(e) => warn!(job_id = %self.job_id, error = %e, "failed to remove job directory"),
            }
        }
        outcome
    }

    async fn run_inner(
        &self,
        command: &RunnerCommand,
        cancel: &CancelSignal,
    ) -> anyhow::Result<WorkerOutcome> {
        info!(
            job_id = %self.job_id,
            program = %command.program,
            args = ?command.args,
            "starting runner process"
        );

        let mut child = command
            .to_command()
            .spawn()
            .with_context(|| format!("spawning runner '{}'", command.program))?;
        let group = child.id().map(ProcessGroup::led_by);
        let (stderr_tail, mut stderr_reader) = self.capture_stderr(&mut child);

        let mut listener: CancelListener = cancel.listener();
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                status = child.wait() => {
                    let status = status.context("waiting for runner process")?;
                    if let Some(reader) = stderr_reader.take() {
                        // Descendants may still hold the pipe open.
                        let _ = timeout(STDERR_DRAIN, reader).await;
                    }
                    info!(
                        job_id = %self.job_id,
                        exit_code = ?status.code(),
                        success = status.success(),
                        "runner process exited"
                    );
                    let tail = stderr_tail
                        .lock()
                        .map(|lines| lines.iter().cloned().collect())
                        .unwrap_or_default();
                    return Ok(WorkerOutcome::Exited { code: status.code(), stderr_tail: tail });
                }

                _ = ticker.tick() => {
                    if !self.cache.spec_exists(&self.job_id) {
                        info!(job_id = %self.job_id, "pipeline spec was deleted; cancelling job");
                        cancel.trigger();
                    }
                }

                _ = listener.cancelled() => {
                    self.terminate(&mut child, group).await;
                    return Ok(WorkerOutcome::Cancelled);
                }
            }
        }
    }

    /// Drain stderr so the pipe never fills; keep the last lines around.
    fn capture_stderr(&self, child: &mut Child) -> (StderrTail, Option<JoinHandle<()>>) {
        let tail: StderrTail = Arc::new(Mutex::new(VecDeque::with_capacity(STDERR_TAIL)));
        let reader = child.stderr.take().map(|stderr| {
            let tail = Arc::clone(&tail);
            let job_id = self.job_id.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(job_id = %job_id, "runner stderr: {}", line);
                    if let Ok(mut tail) = tail.lock() {
                        if tail.len() == STDERR_TAIL {
                            tail.pop_front();
                        }
                        tail.push_back(line);
                    }
                }
            })
        });
        (tail, reader)
    }

    async fn terminate(&self, child: &mut Child, group: Option<ProcessGroup>) {
        info!(
            job_id = %self.job_id,
            pgid = ?group.map(|g| g.id()),
            "terminating runner process group"
        );
        match group {
            Some(group) => {
                if let Err(e) = group.terminate() {
                    warn!(job_id = %self.job_id, error = %e, "failed to terminate runner process group");
                }
            }
            None => {
                if let Err(e) = child.start_kill() {
                    debug!(job_id = %self.job_id, error = %e, "runner already gone");
                }
            }
        }

        match self.status.finish_execution(&self.job_id, false, vec![STOPPED_EXTERNALLY.to_string()]) {
            Ok(true) => info!(job_id = %self.job_id, "recorded cancelled execution"),
            Ok(false) => debug!(job_id = %self.job_id, "execution already finished; status left as is"),
            Err(e) => warn!(job_id = %self.job_id, error = %e, "failed to record cancelled execution"),
        }

        match timeout(self.kill_grace, child.wait()).await {
            Ok(Ok(status)) => debug!(job_id = %self.job_id, ?status, "runner exited after termination"),
            Ok(Err(e)) => warn!(job_id = %self.job_id, error = %e, "failed waiting for terminated runner"),
            Err(_) => {
                warn!(job_id = %self.job_id, "runner still alive after grace period; killing");
                if let Some(group) = group {
                    if let Err(e) = group.kill() {
                        warn!(job_id = %self.job_id, error = %e, "failed to kill runner process group");
                    }
                }
                if let Err(e) = child.kill().await {
                    warn!(job_id = %self.job_id, error = %e, "failed to kill runner process");
                }
            }
        }
    }
}
