// src/coords/processor.rs

//! The `convert_to_decimal_degrees` step applied to a dataset.
//!
//! The datapackage descriptor and rows are plain JSON values, as the runner
//! hands them to processors.

use regex::Regex;
use serde::Deserialize;
use serde::de::{self, Deserializer};
use serde_json::{Map, Number, Value as JsonValue, json};
use tracing::debug;

use crate::coords::{CoordinatePattern, Directional, normalize};
use crate::errors::{Result, TabpipeError};
use crate::types::CoordinateFormat;

/// One field conversion as written in the step parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct CoordinateField {
    pub input_field: String,
    pub output_field: String,
    pub pattern: String,
    pub format: CoordinateFormat,
    /// Overrides the hemisphere in the value. Empty means unset.
    #[serde(default, deserialize_with = "optional_directional")]
    pub directional: Option<Directional>,
}

fn optional_directional<'de, D>(deserializer: D) -> std::result::Result<Option<Directional>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(text) if !text.trim().is_empty() => {
            text.trim().parse().map(Some).map_err(de::Error::custom)
        }
        _ => Ok(None),
    }
}

/// Step parameters: `{resources?, fields}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConvertConfig {
    #[serde(default)]
    pub resources: Option<ResourceSelector>,
    #[serde(default)]
    pub fields: Vec<CoordinateField>,
}

/// Raw `resources` parameter: one name (a regex) or a list of names.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResourceSelector {
    One(String),
    Many(Vec<String>),
}

/// Which resources of a datapackage a step applies to.
#[derive(Debug, Clone)]
pub enum ResourceMatcher {
    All,
    Names(Vec<String>),
    /// Anchored at both ends.
    Pattern(Regex),
}

impl ResourceMatcher {
    pub fn from_selector(selector: Option<&ResourceSelector>) -> Result<Self> {
        Ok(match selector {
            None => ResourceMatcher::All,
            Some(ResourceSelector::Many(names)) => ResourceMatcher::Names(names.clone()),
            Some(ResourceSelector::One(pattern)) => {
                ResourceMatcher::Pattern(Regex::new(&format!("^(?:{pattern})$"))?)
            }
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            ResourceMatcher::All => true,
            ResourceMatcher::Names(names) => names.iter().any(|n| n == name),
            ResourceMatcher::Pattern(re) => re.is_match(name),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledField {
    field: CoordinateField,
    pattern: CoordinatePattern,
}

/// Adds one signed decimal-degree column per configured field.
///
/// Patterns are compiled in [`ConvertToDecimalDegrees::new`], so a missing
/// placeholder fails the step before any row is read.
#[derive(Debug, Clone)]
pub struct ConvertToDecimalDegrees {
    resources: ResourceMatcher,
    fields: Vec<CompiledField>,
}

impl ConvertToDecimalDegrees {
    pub fn new(config: ConvertConfig) -> Result<Self> {
        let resources = ResourceMatcher::from_selector(config.resources.as_ref())?;
        let fields = config
            .fields
            .into_iter()
            .map(|field| {
                let pattern = CoordinatePattern::compile(&field.pattern, field.format)?;
                Ok(CompiledField { field, pattern })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { resources, fields })
    }

    /// Build from the step's `parameters` mapping.
    pub fn from_parameters(parameters: &serde_yaml::Mapping) -> Result<Self> {
        let config: ConvertConfig = serde_yaml::from_value(serde_yaml::Value::Mapping(parameters.clone()))?;
        Self::new(config)
    }

    pub fn applies_to(&self, resource_name: &str) -> bool {
        self.resources.matches(resource_name)
    }

    /// Declare every output field as a number in each matched resource.
    pub fn modify_schema(&self, datapackage: &mut JsonValue) {
        let Some(resources) = datapackage.get_mut("resources").and_then(JsonValue::as_array_mut)
        else {
            return;
        };
        for resource in resources {
            let matched = resource
                .get("name")
                .and_then(JsonValue::as_str)
                .is_some_and(|name| self.applies_to(name));
            if !matched {
                continue;
            }
            let Some(resource) = resource.as_object_mut() else {
                continue;
            };
            let schema = resource.entry("schema").or_insert_with(|| json!({}));
            let Some(schema) = schema.as_object_mut() else {
                continue;
            };
            let fields = schema.entry("fields").or_insert_with(|| json!([]));
            if let Some(fields) = fields.as_array_mut() {
                fields.extend(
                    self.fields
                        .iter()
                        .map(|f| json!({"name": f.field.output_field, "type": "number"})),
                );
            }
        }
    }

    /// Convert every configured field of one row in place.
    pub fn process_row(&self, row: &mut Map<String, JsonValue>) -> Result<()> {
        for compiled in &self.fields {
            let field = &compiled.field;
            let raw = match row.get(&field.input_field) {
                Some(JsonValue::String(s)) => s.clone(),
                Some(JsonValue::Null) | None => {
                    return Err(TabpipeError::Parse(format!(
                        "Input field {} not found in row",
                        field.input_field
                    )));
                }
                Some(other) => other.to_string(),
            };
            let value = normalize(&compiled.pattern, &raw, field.directional)?;
            let number = Number::from_f64(value).ok_or_else(|| {
                TabpipeError::Parse(format!("{value} is not a finite number"))
            })?;
            debug!(input = %raw, output_field = %field.output_field, value, "converted coordinate");
            row.insert(field.output_field.clone(), JsonValue::Number(number));
        }
        Ok(())
    }

    /// Convert all rows of the resource `resource_name`; rows of other
    /// resources pass through untouched.
    pub fn process_resource(
        &self,
        resource_name: &str,
        rows: &mut [Map<String, JsonValue>],
    ) -> Result<()> {
        if !self.applies_to(resource_name) {
            return Ok(());
        }
        rows.iter_mut().try_for_each(|row| self.process_row(row))
    }
}
