// src/spec/mod.rs

//! Pipeline specs: the ordered step list handed to the external runner.
//!
//! - [`model`] holds `PipelineSpec` / `Step` and the builder operations.
//! - [`rules`] is the static table of keys each processor accepts.
//! - [`yaml`] reads and writes the runner's spec file format.

pub mod model;
pub mod rules;
pub mod yaml;

pub use model::{DUMP_PROCESSOR, PipelineSpec, Step};
pub use rules::{ProcessorRule, known_processors, rule_for, validate_step_mapping};
