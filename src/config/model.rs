// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::exec::RunnerEnvironment;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [cache]
/// root = "tmp"
/// retention = "30d"
///
/// [runner]
/// executable = "dpp"
/// processor_path = "/opt/processors"
///
/// [runner.versions."v2.1.0"]
/// executable = "/home/virtualenvs/v2.1.0/bin/dpp"
/// processor_path = "/home/virtualenvs/v2.1.0/processors"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub cache: RawCacheSection,

    #[serde(default)]
    pub runner: RawRunnerSection,
}

/// `[cache]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCacheSection {
    /// Directory holding one subdirectory per job.
    #[serde(default = "default_cache_root")]
    pub root: PathBuf,

    /// Age after which a job directory is garbage collected (e.g. `"30d"`).
    #[serde(default = "default_retention")]
    pub retention: String,
}

fn default_cache_root() -> PathBuf {
    PathBuf::from("tmp")
}

fn default_retention() -> String {
    "30d".to_string()
}

impl Default for RawCacheSection {
    fn default() -> Self {
        Self {
            root: default_cache_root(),
            retention: default_retention(),
        }
    }
}

/// `[runner]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRunnerSection {
    /// Runner executable used when no dedicated version is registered.
    #[serde(default = "default_executable")]
    pub executable: String,

    /// Processor search path handed to the default runner.
    #[serde(default)]
    pub processor_path: PathBuf,

    /// Environment variable the runner reads its processor search path from.
    #[serde(default = "default_search_path_var")]
    pub search_path_var: String,

    /// Environment variable the runner reads the status directory from.
    #[serde(default = "default_status_dir_var")]
    pub status_dir_var: String,

    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    /// How long a terminated runner gets before it is force-killed.
    #[serde(default = "default_kill_grace")]
    pub kill_grace: String,

    /// Dedicated environments keyed by pipeline `version` tag.
    #[serde(default)]
    pub versions: BTreeMap<String, RawRunnerVersion>,
}

fn default_executable() -> String {
    "dpp".to_string()
}

fn default_search_path_var() -> String {
    "DPP_PROCESSOR_PATH".to_string()
}

fn default_status_dir_var() -> String {
    "TABPIPE_STATUS_DIR".to_string()
}

fn default_poll_interval() -> String {
    "1s".to_string()
}

fn default_kill_grace() -> String {
    "2s".to_string()
}

impl Default for RawRunnerSection {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            processor_path: PathBuf::new(),
            search_path_var: default_search_path_var(),
            status_dir_var: default_status_dir_var(),
            poll_interval: default_poll_interval(),
            kill_grace: default_kill_grace(),
            versions: BTreeMap::new(),
        }
    }
}

/// `[runner.versions.<tag>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRunnerVersion {
    pub executable: String,
    pub processor_path: PathBuf,
}

/// Validated configuration.
///
/// Built from [`RawConfigFile`] via `TryFrom`, which parses durations and
/// checks invariants; see `validate.rs`.
#[derive(Debug, Clone)]
pub struct Config {
    pub cache: CacheConfig,
    pub runner: RunnerConfig,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub root: PathBuf,
    pub retention: Duration,
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub default: RunnerEnvironment,
    pub versions: BTreeMap<String, RunnerEnvironment>,
    pub search_path_var: String,
    pub status_dir_var: String,
    pub poll_interval: Duration,
    pub kill_grace: Duration,
}

impl Config {
    pub(crate) fn new_unchecked(cache: CacheConfig, runner: RunnerConfig) -> Self {
        Self { cache, runner }
    }
}

/// Default retention for job directories: 30 days.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(60 * 60 * 24 * 30);

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig {
                root: default_cache_root(),
                retention: DEFAULT_RETENTION,
            },
            runner: RunnerConfig {
                default: RunnerEnvironment::new(default_executable(), PathBuf::new()),
                versions: BTreeMap::new(),
                search_path_var: default_search_path_var(),
                status_dir_var: default_status_dir_var(),
                poll_interval: Duration::from_secs(1),
                kill_grace: Duration::from_secs(2),
            },
        }
    }
}
