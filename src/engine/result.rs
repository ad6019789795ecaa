// src/engine/result.rs

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value as JsonValue;

use crate::cache::{JobId, ResourceData};

/// Outcome of a finished run. Data and error text are mutually exclusive by
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success {
        dataset_metadata: JsonValue,
        resources: BTreeMap<String, ResourceData>,
    },
    Failure {
        error_text: String,
    },
}

/// Result of a run, as returned to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub job_id: JobId,
    /// The caller's spec (without the injected dump step).
    pub spec_text: String,
    pub outcome: Outcome,
}

impl ExecutionResult {
    pub fn failure(job_id: JobId, spec_text: String, error_text: impl Into<String>) -> Self {
        Self {
            job_id,
            spec_text,
            outcome: Outcome::Failure {
                error_text: error_text.into(),
            },
        }
    }

    /// `0` on success, `1` on failure.
    pub fn status_code(&self) -> i32 {
        match self.outcome {
            Outcome::Success { .. } => 0,
            Outcome::Failure { .. } => 1,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code() == 0
    }

    pub fn error_text(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Failure { error_text } => Some(error_text),
            Outcome::Success { .. } => None,
        }
    }

    pub fn resources(&self) -> Option<&BTreeMap<String, ResourceData>> {
        match &self.outcome {
            Outcome::Success { resources, .. } => Some(resources),
            Outcome::Failure { .. } => None,
        }
    }
}

impl Serialize for ExecutionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry("status_code", &self.status_code())?;
        map.serialize_entry("job_id", &self.job_id)?;
        map.serialize_entry("yaml", &self.spec_text)?;
        match &self.outcome {
            Outcome::Success {
                dataset_metadata,
                resources,
            } => {
                map.serialize_entry("datapackage", dataset_metadata)?;
                map.serialize_entry("resources", resources)?;
            }
            Outcome::Failure { error_text } => {
                map.serialize_entry("error_text", error_text)?;
            }
        }
        map.end()
    }
}

/// What `submit` hands back.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// The run finished (foreground), or never managed to start.
    Finished(ExecutionResult),
    /// Background run that has started; poll status/data by `job_id`.
    Started { job_id: JobId, spec_text: String },
}

impl Submission {
    pub fn job_id(&self) -> &JobId {
        match self {
            Submission::Finished(result) => &result.job_id,
            Submission::Started { job_id, .. } => job_id,
        }
    }

    pub fn status_code(&self) -> i32 {
        match self {
            Submission::Finished(result) => result.status_code(),
            Submission::Started { .. } => 0,
        }
    }

    pub fn into_result(self) -> Option<ExecutionResult> {
        match self {
            Submission::Finished(result) => Some(result),
            Submission::Started { .. } => None,
        }
    }
}

impl Serialize for Submission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Submission::Finished(result) => result.serialize(serializer),
            Submission::Started { job_id, spec_text } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("status_code", &0)?;
                map.serialize_entry("job_id", job_id)?;
                map.serialize_entry("yaml", spec_text)?;
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_carries_either_data_or_error() {
        let id = JobId::generate();
        let ok = ExecutionResult {
            job_id: id.clone(),
            spec_text: "p: {}".into(),
            outcome: Outcome::Success {
                dataset_metadata: serde_json::json!({"name": "p"}),
                resources: BTreeMap::new(),
            },
        };
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status_code"], 0);
        assert!(json.get("resources").is_some());
        assert!(json.get("error_text").is_none());

        let failed = ExecutionResult::failure(id, "p: {}".into(), "boom");
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status_code"], 1);
        assert_eq!(json["error_text"], "boom");
        assert!(json.get("datapackage").is_none());
        assert!(json.get("resources").is_none());
    }
}
