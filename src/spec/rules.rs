// src/spec/rules.rs

//! Static table of the keys each processor accepts.
//!
//! The external runner silently ignores keys it does not understand, which
//! turns typos into pipelines that quietly do nothing. Every step is checked
//! against this table before it is appended to a spec.

use serde_yaml::{Mapping, Value};

use crate::errors::{Result, TabpipeError};

/// Allowed keys for one processor.
#[derive(Debug, Clone, Copy)]
pub struct ProcessorRule {
    pub name: &'static str,
    pub top_keys: &'static [&'static str],
    /// `None` means any parameter key is accepted.
    pub parameter_keys: Option<&'static [&'static str]>,
    /// Keys allowed inside each entry of a `fields` list.
    pub field_keys: Option<&'static [&'static str]>,
}

const STANDARD_TOP: &[&str] = &["run", "cache", "parameters"];

const fn rule(
    name: &'static str,
    parameter_keys: Option<&'static [&'static str]>,
    field_keys: Option<&'static [&'static str]>,
) -> ProcessorRule {
    ProcessorRule {
        name,
        top_keys: STANDARD_TOP,
        parameter_keys,
        field_keys,
    }
}

static RULES: &[ProcessorRule] = &[
    rule(
        "add_resource",
        Some(&["name", "url", "format", "sheet", "headers"]),
        None,
    ),
    rule("add_metadata", None, None),
    rule("set_types", Some(&["resources", "types"]), None),
    rule(
        "stream_remote_resources",
        Some(&["resources", "limit-rows"]),
        None,
    ),
    rule("concatenate", Some(&["fields", "target", "sources"]), None),
    rule("join", Some(&["target", "source", "fields"]), None),
    rule("delete_fields", Some(&["fields", "resources"]), None),
    rule("sort", Some(&["sort-by", "resources"]), None),
    rule(
        "add_computed_field",
        Some(&["fields", "resources"]),
        Some(&["operation", "target", "source", "with"]),
    ),
    rule(
        "find_replace",
        Some(&["fields", "resources"]),
        Some(&["name", "patterns"]),
    ),
    rule(
        "round_fields",
        Some(&["fields", "resources"]),
        Some(&["digits", "name"]),
    ),
    rule(
        "convert_to_decimal_degrees",
        Some(&["fields", "resources"]),
        Some(&["format", "input_field", "output_field", "pattern", "directional"]),
    ),
    rule(
        "convert_date",
        Some(&["fields", "resources"]),
        Some(&[
            "input_field",
            "input_format",
            "input_timezone",
            "output_field",
            "output_format",
            "output_timezone",
            "year",
        ]),
    ),
    ProcessorRule {
        name: "infer_types",
        top_keys: &["run", "cache"],
        parameter_keys: None,
        field_keys: None,
    },
    rule("dump_to_path", Some(&["out-path"]), None),
    rule(
        "boolean_add_computed_field",
        Some(&["fields", "resources"]),
        Some(&["functions", "target"]),
    ),
    rule("add_schema_metadata", None, None),
];

/// Look up the rule for a processor name.
pub fn rule_for(processor: &str) -> Option<&'static ProcessorRule> {
    RULES.iter().find(|r| r.name == processor)
}

/// Names of every processor the table knows about.
pub fn known_processors() -> impl Iterator<Item = &'static str> {
    RULES.iter().map(|r| r.name)
}

/// Validate a raw step mapping (`run`, `cache`, `parameters`).
pub fn validate_step_mapping(step: &Mapping) -> Result<()> {
    let processor = step
        .get("run")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            let keys: Vec<String> = step.keys().map(display_key).collect();
            TabpipeError::step("<unknown>", format!("\"run\" must be a key of the step object: {keys:?}"))
        })?;

    let rule = rule_for(processor)
        .ok_or_else(|| {
            let known: Vec<&str> = known_processors().collect();
            TabpipeError::step(processor, format!("unknown processor (known: {known:?})"))
        })?;

    for key in step.keys() {
        let key = display_key(key);
        if !rule.top_keys.contains(&key.as_str()) {
            return Err(TabpipeError::step(
                processor,
                format!("invalid top-level key '{key}' (allowed: {:?})", rule.top_keys),
            ));
        }
    }

    if let Some(cache) = step.get("cache") {
        if !cache.is_bool() {
            return Err(TabpipeError::step(processor, "'cache' must be a boolean"));
        }
    }

    match step.get("parameters") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::Mapping(params)) => validate_parameters(rule, params),
        Some(_) => Err(TabpipeError::step(processor, "'parameters' must be a mapping")),
    }
}

fn validate_parameters(rule: &ProcessorRule, params: &Mapping) -> Result<()> {
    if let Some(allowed) = rule.parameter_keys {
        for key in params.keys() {
            let key = display_key(key);
            if !allowed.contains(&key.as_str()) {
                return Err(TabpipeError::step(
                    rule.name,
                    format!("invalid parameter key '{key}' (allowed: {allowed:?})"),
                ));
            }
        }
    }

    let (Some(field_keys), Some(Value::Sequence(fields))) = (rule.field_keys, params.get("fields"))
    else {
        return Ok(());
    };

    for field in fields {
        let Value::Mapping(field) = field else {
            return Err(TabpipeError::step(rule.name, "each entry of 'fields' must be a mapping"));
        };
        for key in field.keys() {
            let key = display_key(key);
            if !field_keys.contains(&key.as_str()) {
                return Err(TabpipeError::step(
                    rule.name,
                    format!("invalid field key '{key}' (allowed: {field_keys:?})"),
                ));
            }
        }
    }
    Ok(())
}

fn display_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn accepts_known_step() {
        let step = mapping(
            "run: delete_fields\nparameters:\n  fields: [Lander]\n  resources: [data]\n",
        );
        validate_step_mapping(&step).unwrap();
    }

    #[test]
    fn rejects_missing_run() {
        let step = mapping("parameters: {}\n");
        let err = validate_step_mapping(&step).unwrap_err();
        assert!(err.to_string().contains("\"run\" must be a key"));
    }

    #[test]
    fn rejects_unknown_processor() {
        let step = mapping("run: explode\n");
        let err = validate_step_mapping(&step).unwrap_err();
        assert!(matches!(err, TabpipeError::StepValidation { .. }));
        assert!(err.to_string().contains("convert_to_decimal_degrees"), "{err}");
        assert_eq!(known_processors().count(), 17);
    }

    #[test]
    fn rejects_unknown_parameter_and_field_keys() {
        let step = mapping("run: sort\nparameters:\n  sort_by: Taxon\n");
        assert!(validate_step_mapping(&step).unwrap_err().to_string().contains("sort_by"));

        let step = mapping(
            "run: convert_to_decimal_degrees\nparameters:\n  fields:\n    - input_field: Lat\n      ouput_field: x\n",
        );
        assert!(validate_step_mapping(&step).unwrap_err().to_string().contains("ouput_field"));
    }

    #[test]
    fn infer_types_takes_no_parameters() {
        let step = mapping("run: infer_types\nparameters: {}\n");
        assert!(validate_step_mapping(&step).is_err());
        validate_step_mapping(&mapping("run: infer_types\ncache: true\n")).unwrap();
    }

    #[test]
    fn free_form_parameters_are_accepted() {
        let step = mapping("run: add_metadata\nparameters:\n  anything: 1\n  else: two\n");
        validate_step_mapping(&step).unwrap();
    }
}
