// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::coords::Directional;
use crate::types::CoordinateFormat;

/// Command-line arguments for `tabpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tabpipe",
    version,
    about = "Build, run and inspect tabular-data pipelines.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Tabpipe.toml` in the current working directory; built-in
    /// defaults are used when it does not exist.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TABPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a pipeline spec (YAML) and print the result as JSON.
    Run {
        /// Pipeline spec file.
        #[arg(value_name = "SPEC")]
        spec: PathBuf,

        /// Job id to use (canonical UUID). Generated when omitted.
        #[arg(long, value_name = "UUID")]
        job_id: Option<String>,

        /// Run the pipeline runner verbosely and keep its full error log.
        #[arg(long)]
        verbose: bool,

        /// Return as soon as the runner has started.
        #[arg(long)]
        background: bool,

        /// Rows per resource to include in the output (-1 for all).
        #[arg(long, value_name = "N", default_value_t = -1, allow_negative_numbers = true)]
        num_rows: i64,
    },

    /// Print the last execution status of a job.
    Status {
        job_id: String,
    },

    /// Print the results of a job.
    Data {
        job_id: String,

        #[arg(long, value_name = "N", default_value_t = -1, allow_negative_numbers = true)]
        num_rows: i64,
    },

    /// Remove a job's directory.
    Delete {
        job_id: String,
    },

    /// Cancel a running job.
    Cancel {
        job_id: String,
    },

    /// Remove stale job directories from the cache root.
    Gc,

    /// Convert coordinate strings to decimal degrees.
    ConvertCoords {
        /// Input format.
        #[arg(long, value_name = "FORMAT")]
        format: CoordinateFormat,

        /// Template (`%degrees%` ...) or named-group regex.
        #[arg(long, value_name = "PATTERN")]
        pattern: String,

        /// Hemisphere to apply instead of the one in the value.
        #[arg(long, value_name = "N|S|E|W")]
        directional: Option<Directional>,

        #[arg(required = true, value_name = "VALUE")]
        values: Vec<String>,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_flags_are_parsed() {
        let args = CliArgs::try_parse_from([
            "tabpipe",
            "run",
            "spec.yaml",
            "--background",
            "--num-rows",
            "5",
            "--log-level",
            "debug",
        ])
        .unwrap();
        match args.command {
            Command::Run {
                spec,
                background,
                verbose,
                num_rows,
                job_id,
            } => {
                assert_eq!(spec, PathBuf::from("spec.yaml"));
                assert!(background);
                assert!(!verbose);
                assert_eq!(num_rows, 5);
                assert!(job_id.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    }

    #[test]
    fn convert_coords_parses_format_and_directional() {
        let args = CliArgs::try_parse_from([
            "tabpipe",
            "convert-coords",
            "--format",
            "degrees-decimal_minutes",
            "--pattern",
            "%degrees% %decimal_minutes%",
            "--directional",
            "South",
            "10 30",
        ])
        .unwrap();
        match args.command {
            Command::ConvertCoords {
                format,
                directional,
                values,
                ..
            } => {
                assert_eq!(format, CoordinateFormat::DegreesDecimalMinutes);
                assert_eq!(directional, Some(Directional::S));
                assert_eq!(values, ["10 30"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
