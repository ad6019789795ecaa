// src/config/validate.rs

use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::model::{CacheConfig, Config, RawConfigFile, RunnerConfig};
use crate::errors::{Result, TabpipeError};
use crate::exec::RunnerEnvironment;

impl TryFrom<RawConfigFile> for Config {
    type Error = TabpipeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let cache = validate_cache(&raw)?;
        let runner = validate_runner(&raw)?;
        Ok(Config::new_unchecked(cache, runner))
    }
}

fn validate_cache(raw: &RawConfigFile) -> Result<CacheConfig> {
    if raw.cache.root.as_os_str().is_empty() {
        return Err(TabpipeError::Config(
            "[cache].root must not be empty".to_string(),
        ));
    }

    let retention = parse_duration(&raw.cache.retention)
        .map_err(|e| TabpipeError::Config(format!("[cache].retention: {e}")))?;

    Ok(CacheConfig {
        root: raw.cache.root.clone(),
        retention,
    })
}

fn validate_runner(raw: &RawConfigFile) -> Result<RunnerConfig> {
    let runner = &raw.runner;

    if runner.executable.trim().is_empty() {
        return Err(TabpipeError::Config(
            "[runner].executable must not be empty".to_string(),
        ));
    }
    for (key, name) in [
        ("search_path_var", &runner.search_path_var),
        ("status_dir_var", &runner.status_dir_var),
    ] {
        if name.is_empty() || name.contains('=') {
            return Err(TabpipeError::Config(format!(
                "[runner].{key} is not a valid environment variable name: {name:?}"
            )));
        }
    }

    let poll_interval = parse_duration(&runner.poll_interval)
        .map_err(|e| TabpipeError::Config(format!("[runner].poll_interval: {e}")))?;
    if poll_interval.is_zero() {
        return Err(TabpipeError::Config(
            "[runner].poll_interval must be > 0".to_string(),
        ));
    }
    let kill_grace = parse_duration(&runner.kill_grace)
        .map_err(|e| TabpipeError::Config(format!("[runner].kill_grace: {e}")))?;

    let mut versions = BTreeMap::new();
    for (tag, version) in runner.versions.iter() {
        if version.executable.trim().is_empty() {
            return Err(TabpipeError::Config(format!(
                "[runner.versions.{tag:?}].executable must not be empty"
            )));
        }
        versions.insert(
            tag.clone(),
            RunnerEnvironment::new(version.executable.clone(), version.processor_path.clone()),
        );
    }

    Ok(RunnerConfig {
        default: RunnerEnvironment::new(runner.executable.clone(), runner.processor_path.clone()),
        versions,
        search_path_var: runner.search_path_var.clone(),
        status_dir_var: runner.status_dir_var.clone(),
        poll_interval,
        kill_grace,
    })
}

/// Parse a duration like `"500ms"`, `"1s"`, `"10m"`, `"2h"` or `"30d"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let seconds_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 60 * 60 * 24,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, h, or d",
                unit
            ));
        }
    };
    value
        .checked_mul(seconds_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration out of range: {s}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::RawRunnerVersion;
    use std::path::PathBuf;

    #[test]
    fn parses_day_suffix() {
        assert_eq!(parse_duration("30d").unwrap(), Duration::from_secs(2_592_000));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("3w").is_err());
    }

    #[test]
    fn oversized_duration_is_an_error() {
        let err = parse_duration("300000000000000d").unwrap_err();
        assert!(err.contains("out of range"), "{err}");
        assert_eq!(
            parse_duration(&format!("{}s", u64::MAX)).unwrap(),
            Duration::from_secs(u64::MAX)
        );

        let mut raw = RawConfigFile::default();
        raw.cache.retention = "300000000000000d".to_string();
        match Config::try_from(raw) {
            Err(TabpipeError::Config(msg)) => assert!(msg.contains("retention"), "{msg}"),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn default_raw_config_validates() {
        let cfg = Config::try_from(RawConfigFile::default()).unwrap();
        assert_eq!(cfg.cache.retention, crate::config::model::DEFAULT_RETENTION);
        assert_eq!(cfg.runner.poll_interval, Duration::from_secs(1));
        assert_eq!(cfg.runner.default.executable, "dpp");
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.runner.poll_interval = "0s".to_string();
        match Config::try_from(raw) {
            Err(TabpipeError::Config(msg)) => assert!(msg.contains("poll_interval")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn version_with_empty_executable_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.runner.versions.insert(
            "v1".to_string(),
            RawRunnerVersion {
                executable: " ".to_string(),
                processor_path: PathBuf::from("/p"),
            },
        );
        assert!(matches!(Config::try_from(raw), Err(TabpipeError::Config(_))));
    }
}
