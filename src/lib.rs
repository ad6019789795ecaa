// src/lib.rs

pub mod cache;
pub mod cli;
pub mod config;
pub mod coords;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod spec;
pub mod status;
pub mod types;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::{Config, default_config_path, load_and_validate, load_or_default};
use crate::coords::CoordinatePattern;
use crate::engine::{ExecutionEngine, SubmitOptions};
use crate::spec::PipelineSpec;

/// High-level entry point used by `main.rs`.
///
/// Loads the config, runs one subcommand and prints its JSON output.
/// Returns the process exit code: `1` for a failed run, `0` otherwise.
pub async fn run(args: CliArgs) -> Result<i32> {
    let config = load_config(args.config.as_deref())?;
    debug!(?config, "configuration loaded");

    let engine = ExecutionEngine::from_config(&config)?;
    dispatch(&engine, args.command).await
}

async fn dispatch(engine: &ExecutionEngine, command: Command) -> Result<i32> {
    match command {
        Command::Run {
            spec,
            job_id,
            verbose,
            background,
            num_rows,
        } => {
            let spec = read_spec(&spec)?;
            let options = SubmitOptions {
                verbose,
                background,
                limit_rows: num_rows,
            };
            let submission = engine.submit(&spec, job_id.as_deref(), options).await?;
            info!(job_id = %submission.job_id(), status_code = submission.status_code(), "run finished");
            print_json(&submission)?;
            Ok(submission.status_code())
        }
        Command::Status { job_id } => {
            print_json(&engine.get_status(&job_id)?)?;
            Ok(0)
        }
        Command::Data { job_id, num_rows } => {
            print_json(&engine.get_data(&job_id, num_rows)?)?;
            Ok(0)
        }
        Command::Delete { job_id } => {
            engine.delete_pipeline_data(&job_id)?;
            print_json(&json!({ "job_id": job_id, "deleted": true }))?;
            Ok(0)
        }
        Command::Cancel { job_id } => {
            let cancelled = engine.cancel(&job_id)?;
            print_json(&json!({ "job_id": job_id, "cancelled": cancelled }))?;
            Ok(0)
        }
        Command::Gc => {
            let report = engine.collect_garbage().await;
            let errors: Vec<_> = report
                .errors
                .iter()
                .map(|(path, error)| json!({ "path": path, "error": error }))
                .collect();
            print_json(&json!({ "removed": report.removed, "errors": errors }))?;
            Ok(if report.is_clean() { 0 } else { 1 })
        }
        Command::ConvertCoords {
            format,
            pattern,
            directional,
            values,
        } => {
            let pattern = CoordinatePattern::compile(&pattern, format)?;
            let converted = values
                .iter()
                .map(|value| coords::normalize(&pattern, value, directional))
                .collect::<errors::Result<Vec<f64>>>()?;
            print_json(&converted)?;
            Ok(0)
        }
    }
}

/// An explicit `--config` must exist; the default path is optional.
fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => load_and_validate(path)?,
        None => load_or_default(default_config_path())?,
    };
    Ok(config)
}

fn read_spec(path: &Path) -> Result<PipelineSpec> {
    let text = fs::read_to_string(path).with_context(|| format!("reading pipeline spec {:?}", path))?;
    let spec = PipelineSpec::from_yaml(&text)
        .with_context(|| format!("parsing pipeline spec {:?}", path))?;
    Ok(spec)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
