// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Input encoding of a coordinate string.
///
/// - `DegreesMinutesSeconds`: `%degrees%`, `%minutes%` and `%seconds%` are
///   extracted and folded into decimal minutes.
/// - `DegreesDecimalMinutes`: `%degrees%` and `%decimal_minutes%` are
///   extracted directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateFormat {
    #[serde(rename = "degrees-minutes-seconds", alias = "DMS")]
    DegreesMinutesSeconds,
    #[serde(rename = "degrees-decimal_minutes", alias = "DM")]
    DegreesDecimalMinutes,
}

impl CoordinateFormat {
    /// Components that must be present in a pattern for this format.
    pub fn required_components(self) -> &'static [&'static str] {
        match self {
            CoordinateFormat::DegreesMinutesSeconds => &["degrees", "minutes", "seconds"],
            CoordinateFormat::DegreesDecimalMinutes => &["degrees", "decimal_minutes"],
        }
    }
}

impl FromStr for CoordinateFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "degrees-minutes-seconds" | "DMS" | "dms" => Ok(CoordinateFormat::DegreesMinutesSeconds),
            "degrees-decimal_minutes" | "DM" | "dm" => Ok(CoordinateFormat::DegreesDecimalMinutes),
            other => Err(format!(
                "invalid coordinate format: {other} (expected \"degrees-minutes-seconds\" or \"degrees-decimal_minutes\")"
            )),
        }
    }
}

/// Lifecycle of a single job inside the engine.
///
/// `Cancelled` is only reachable from `Running`, through the cancellation
/// signal (sentinel deletion or an explicit cancel request).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Created,
    SpecWritten,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::Cancelled
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Created => "created",
            JobState::SpecWritten => "spec_written",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}
