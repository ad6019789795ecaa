// src/exec/environment.rs

//! Which runner executable (and processor search path) runs a given
//! pipeline `version`.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::config::RunnerConfig;

/// A runner executable together with the processors it should load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerEnvironment {
    pub executable: String,
    pub processor_path: PathBuf,
}

impl RunnerEnvironment {
    pub fn new(executable: impl Into<String>, processor_path: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            processor_path: processor_path.into(),
        }
    }
}

/// Explicit version tag → environment mapping, built once at startup.
///
/// Tags without a dedicated entry (including the empty tag) resolve to the
/// default environment.
#[derive(Debug, Clone)]
pub struct EnvironmentRegistry {
    default: RunnerEnvironment,
    versions: BTreeMap<String, RunnerEnvironment>,
}

impl EnvironmentRegistry {
    pub fn new(default: RunnerEnvironment) -> Self {
        Self {
            default,
            versions: BTreeMap::new(),
        }
    }

    pub fn from_config(runner: &RunnerConfig) -> Self {
        Self {
            default: runner.default.clone(),
            versions: runner.versions.clone(),
        }
    }

    pub fn register(&mut self, version: impl Into<String>, env: RunnerEnvironment) {
        self.versions.insert(version.into(), env);
    }

    pub fn resolve(&self, version: &str) -> &RunnerEnvironment {
        self.versions.get(version).unwrap_or(&self.default)
    }

    pub fn default_environment(&self) -> &RunnerEnvironment {
        &self.default
    }
}

/// Fully resolved invocation of the external runner.
///
/// Everything the child needs is carried here and applied to the child's
/// `Command`; the host process environment is never modified.
#[derive(Debug, Clone)]
pub struct RunnerCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub envs: Vec<(String, OsString)>,
    /// Pipe stderr back to the supervisor. Off for runs that must outlive
    /// the host process, where a closed pipe would kill the runner.
    pub capture_stderr: bool,
}

impl RunnerCommand {
    /// `{executable} run [--verbose] {pipeline_id}`, executed from `working_dir`.
    pub fn new(env: &RunnerEnvironment, pipeline_id: &str, verbose: bool, working_dir: &Path) -> Self {
        let mut args = vec!["run".to_string()];
        if verbose {
            args.push("--verbose".to_string());
        }
        args.push(pipeline_id.to_string());

        Self {
            program: env.executable.clone(),
            args,
            working_dir: working_dir.to_path_buf(),
            envs: Vec::new(),
            capture_stderr: true,
        }
    }

    pub fn detached(mut self) -> Self {
        self.capture_stderr = false;
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Build the child command. The child gets its own process group so the
    /// whole tree can be signalled at once.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.working_dir)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(if self.capture_stderr {
                Stdio::piped()
            } else {
                Stdio::null()
            });
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }
}
