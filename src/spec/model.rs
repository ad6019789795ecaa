// src/spec/model.rs

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::errors::{Result, TabpipeError};
use crate::spec::rules::validate_step_mapping;

/// Processor name of the step appended to every derived spec.
pub const DUMP_PROCESSOR: &str = "dump_to_path";

/// One processing step.
///
/// On disk the processor name lives under the runner's `run` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(rename = "run")]
    pub processor: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Mapping>,
}

impl Step {
    pub fn new(processor: impl Into<String>) -> Self {
        Self {
            processor: processor.into(),
            cache: None,
            parameters: None,
        }
    }

    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set one parameter, creating the parameter mapping if needed.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters
            .get_or_insert_with(Mapping::new)
            .insert(Value::String(key.into()), value.into());
        self
    }

    fn to_mapping(&self) -> Result<Mapping> {
        match serde_yaml::to_value(self)? {
            Value::Mapping(m) => Ok(m),
            other => Err(TabpipeError::InvalidSpec(format!(
                "step did not serialize to a mapping: {other:?}"
            ))),
        }
    }
}

/// An ordered list of steps plus the metadata describing one pipeline.
///
/// Steps are executed in order; every step in `steps` has passed the rule
/// table, which is why the field is private and only grows through
/// [`PipelineSpec::add_step`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSpec {
    pub name: String,
    pub title: String,
    pub description: String,
    pub version: String,
    steps: Vec<Step>,
}

impl PipelineSpec {
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            title: title.into(),
            description: description.into(),
            version: version.into(),
            steps: Vec::new(),
        })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Validate `step` against the rule table and append it.
    pub fn add_step(&mut self, step: Step) -> Result<()> {
        validate_step_mapping(&step.to_mapping()?)?;
        self.steps.push(step);
        Ok(())
    }

    /// Validate and append a raw step value (must be a mapping with `run`).
    ///
    /// Unlike [`add_step`](Self::add_step) this sees every key the caller
    /// wrote, so unknown top-level keys are reported instead of dropped.
    pub fn add_step_value(&mut self, value: Value) -> Result<()> {
        let Value::Mapping(mapping) = value else {
            return Err(TabpipeError::step("<unknown>", "Object must be a dictionary"));
        };
        validate_step_mapping(&mapping)?;
        let step: Step = serde_yaml::from_value(Value::Mapping(mapping))?;
        self.steps.push(step);
        Ok(())
    }

    /// Steps of the derived spec: the caller's steps followed by a dump step
    /// that materializes the dataset into `results_dir`.
    pub fn with_dump_step(&self, results_dir: &Path) -> Vec<Step> {
        let mut steps = self.steps.clone();
        steps.push(Step::new(DUMP_PROCESSOR).with_parameter(
            "out-path",
            results_dir.to_string_lossy().into_owned(),
        ));
        steps
    }

    /// Identifier the runner uses for this pipeline inside the cache root.
    pub fn pipeline_id(&self, job_id: &str) -> String {
        format!("./{}/{}", job_id, self.name)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(TabpipeError::InvalidSpec("pipeline name must not be empty".to_string()));
    }
    if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(TabpipeError::InvalidSpec(format!(
            "pipeline name must be a single path component: {name:?}"
        )));
    }
    Ok(())
}
