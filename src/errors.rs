// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TabpipeError {
    #[error("The unique ID that was provided was not in uuid format: {0:?}")]
    InvalidJobId(String),

    #[error("Job {0} is already running in this engine")]
    JobInFlight(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid pipeline spec: {0}")]
    InvalidSpec(String),

    #[error("Invalid step for processor '{processor}': {reason}")]
    StepValidation { processor: String, reason: String },

    #[error("Pipeline runner failed: {0}")]
    RunnerFailure(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("%{placeholder}% not in the pattern {pattern:?} for converting to decimal degrees")]
    MissingPlaceholder {
        placeholder: String,
        pattern: String,
    },

    #[error("Non csv formats are not supported: {0}")]
    UnsupportedFormat(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TabpipeError {
    pub(crate) fn step(processor: impl Into<String>, reason: impl Into<String>) -> Self {
        TabpipeError::StepValidation {
            processor: processor.into(),
            reason: reason.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TabpipeError>;
