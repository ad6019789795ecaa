// src/spec/yaml.rs

//! Reading and writing the runner's `pipeline-spec.yaml` format:
//!
//! ```yaml
//! test-pipeline:
//!   title: Test Pipeline
//!   description: Testing
//!   version: v2.1.0
//!   pipeline:
//!     - run: add_resource
//!       parameters: { name: data, url: data.csv }
//! ```

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::errors::{Result, TabpipeError};
use crate::spec::model::{PipelineSpec, Step};

#[derive(Serialize)]
struct SpecBody<'a> {
    title: &'a str,
    description: &'a str,
    version: &'a str,
    pipeline: &'a [Step],
}

impl PipelineSpec {
    /// Serialize this spec with its own steps.
    pub fn to_yaml(&self) -> Result<String> {
        self.to_yaml_with(self.steps())
    }

    /// Serialize this spec's metadata with an arbitrary step list (used for
    /// the derived spec).
    pub fn to_yaml_with(&self, steps: &[Step]) -> Result<String> {
        let body = SpecBody {
            title: &self.title,
            description: &self.description,
            version: &self.version,
            pipeline: steps,
        };
        let mut root = Mapping::new();
        root.insert(Value::String(self.name.clone()), serde_yaml::to_value(body)?);
        Ok(serde_yaml::to_string(&root)?)
    }

    /// Parse a `pipeline-spec.yaml` document; every step is re-validated.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let root: Value = serde_yaml::from_str(text)?;
        let root = match root {
            Value::Mapping(m) if m.len() == 1 => m,
            _ => {
                return Err(TabpipeError::InvalidSpec(
                    "improperly formatted pipeline spec: must have a single key mapping as the root"
                        .to_string(),
                ));
            }
        };

        let Some((name, body)) = root.into_iter().next() else {
            return Err(TabpipeError::InvalidSpec("empty pipeline spec".to_string()));
        };
        let name = scalar_to_string(&name)
            .ok_or_else(|| TabpipeError::InvalidSpec("pipeline name must be a string".to_string()))?;
        let Value::Mapping(mut body) = body else {
            return Err(TabpipeError::InvalidSpec(format!(
                "pipeline '{name}' must be a mapping"
            )));
        };

        let title = take_string(&mut body, "title")?.unwrap_or_else(|| name.clone());
        let description = take_string(&mut body, "description")?.unwrap_or_default();
        let version = take_string(&mut body, "version")?.unwrap_or_default();

        let steps = match body.remove("pipeline") {
            Some(Value::Sequence(steps)) => steps,
            Some(_) => {
                return Err(TabpipeError::InvalidSpec(
                    "pipeline in file must be a list".to_string(),
                ));
            }
            None => {
                return Err(TabpipeError::InvalidSpec(
                    "pipeline not found while parsing file".to_string(),
                ));
            }
        };

        let mut spec = PipelineSpec::new(name, title, description, version)?;
        for step in steps {
            spec.add_step_value(step)?;
        }
        Ok(spec)
    }
}

fn take_string(body: &mut Mapping, key: &str) -> Result<Option<String>> {
    match body.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_to_string(&value)
            .map(Some)
            .ok_or_else(|| TabpipeError::InvalidSpec(format!("'{key}' must be a scalar"))),
    }
}

/// Versions like `1.0` come back from YAML as numbers; keep their text.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
