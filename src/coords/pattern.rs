// src/coords/pattern.rs

//! Compiled coordinate patterns.
//!
//! Two syntaxes are accepted:
//!
//! - templates such as `%directional% %degrees%o %decimal_minutes%`, where
//!   every placeholder is one coordinate component and everything else is
//!   literal text;
//! - regular expressions with named groups, such as
//!   `(?P<directional>.*) (?P<degrees>.*)o (?P<decimal_minutes>.*)`.
//!
//! A pattern is treated as a template as soon as it contains one of the
//! known `%name%` placeholders.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::coords::directional::Directional;
use crate::errors::{Result, TabpipeError};
use crate::types::CoordinateFormat;

pub const DEGREES: &str = "degrees";
pub const MINUTES: &str = "minutes";
pub const SECONDS: &str = "seconds";
pub const DECIMAL_MINUTES: &str = "decimal_minutes";
pub const DIRECTIONAL: &str = "directional";

const COMPONENTS: [&str; 5] = [DEGREES, MINUTES, SECONDS, DECIMAL_MINUTES, DIRECTIONAL];

const NUMBER_CAPTURE: &str = r"(\d*\.?\d+)";
const WORD_CAPTURE: &str = r"(\w+)";
const WILDCARD: &str = ".*";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%(degrees|minutes|seconds|decimal_minutes|directional)%")
        .expect("placeholder regex is valid")
});

/// A coordinate pattern checked against its format and compiled once, then
/// applied to every row.
#[derive(Debug, Clone)]
pub struct CoordinatePattern {
    source: String,
    format: CoordinateFormat,
    matcher: Matcher,
}

#[derive(Debug, Clone)]
enum Matcher {
    /// One anchored regex per component present in the template.
    Template(BTreeMap<&'static str, Regex>),
    /// A single anchored regex with named groups.
    Named(Regex),
}

#[derive(Debug, Clone, PartialEq)]
enum Segment<'a> {
    Literal(&'a str),
    Placeholder(&'static str),
}

impl CoordinatePattern {
    /// Compile `pattern` for `format`.
    ///
    /// Fails with [`TabpipeError::MissingPlaceholder`] when a component the
    /// format needs is absent.
    pub fn compile(pattern: &str, format: CoordinateFormat) -> Result<Self> {
        let matcher = if PLACEHOLDER.is_match(pattern) {
            compile_template(pattern)?
        } else {
            Matcher::Named(Regex::new(&format!("^(?:{pattern})"))?)
        };

        let compiled = Self {
            source: pattern.to_string(),
            format,
            matcher,
        };
        for component in format.required_components() {
            if !compiled.has_component(component) {
                return Err(TabpipeError::MissingPlaceholder {
                    placeholder: (*component).to_string(),
                    pattern: pattern.to_string(),
                });
            }
        }
        Ok(compiled)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn format(&self) -> CoordinateFormat {
        self.format
    }

    pub fn has_component(&self, name: &str) -> bool {
        match &self.matcher {
            Matcher::Template(regexes) => regexes.contains_key(name),
            Matcher::Named(regex) => regex.capture_names().flatten().any(|n| n == name),
        }
    }

    /// Extract the numeric component `name` from `raw`.
    pub fn numeric(&self, name: &str, raw: &str) -> Result<f64> {
        let text = self.capture(name, raw)?;
        text.trim().parse::<f64>().map_err(|_| {
            TabpipeError::Parse(format!(
                "{name} in {raw:?} is not a number: {text:?} (pattern {:?})",
                self.source
            ))
        })
    }

    /// Extract and normalize the directional, if the pattern has one.
    pub fn directional(&self, raw: &str) -> Result<Option<Directional>> {
        if !self.has_component(DIRECTIONAL) {
            return Ok(None);
        }
        self.capture(DIRECTIONAL, raw)?.parse().map(Some)
    }

    fn capture(&self, name: &str, raw: &str) -> Result<String> {
        let (regex, found) = match &self.matcher {
            Matcher::Template(regexes) => {
                let regex = regexes.get(name).ok_or_else(|| missing(name, &self.source))?;
                let found = regex
                    .captures(raw)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string());
                (regex, found)
            }
            Matcher::Named(regex) => {
                if !self.has_component(name) {
                    return Err(missing(name, &self.source));
                }
                let found = regex
                    .captures(raw)
                    .and_then(|c| c.name(name))
                    .map(|m| m.as_str().to_string());
                (regex, found)
            }
        };
        found.ok_or_else(|| {
            TabpipeError::Parse(format!(
                "Match not found for {name}: expression \"{}\" and value \"{raw}\"",
                regex.as_str()
            ))
        })
    }
}

fn missing(name: &str, pattern: &str) -> TabpipeError {
    TabpipeError::MissingPlaceholder {
        placeholder: name.to_string(),
        pattern: pattern.to_string(),
    }
}

fn compile_template(pattern: &str) -> Result<Matcher> {
    let segments = split_template(pattern);
    let mut regexes = BTreeMap::new();
    for target in COMPONENTS {
        if !segments.contains(&Segment::Placeholder(target)) {
            continue;
        }
        let capture = if target == DIRECTIONAL {
            WORD_CAPTURE
        } else {
            NUMBER_CAPTURE
        };
        let mut source = String::from("^");
        for segment in &segments {
            match segment {
                Segment::Literal(text) => source.push_str(&regex::escape(text)),
                Segment::Placeholder(name) if *name == target => source.push_str(capture),
                Segment::Placeholder(_) => source.push_str(WILDCARD),
            }
        }
        regexes.insert(target, Regex::new(&source)?);
    }
    Ok(Matcher::Template(regexes))
}

fn split_template(pattern: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(pattern) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            segments.push(Segment::Literal(&pattern[last..whole.start()]));
        }
        if let Some(component) = COMPONENTS.iter().find(|c| **c == name.as_str()) {
            segments.push(Segment::Placeholder(*component));
        }
        last = whole.end();
    }
    if last < pattern.len() {
        segments.push(Segment::Literal(&pattern[last..]));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_components_are_extracted() {
        let pattern = CoordinatePattern::compile(
            "%directional% %degrees%° %minutes%' %seconds%\"",
            CoordinateFormat::DegreesMinutesSeconds,
        )
        .unwrap();
        let raw = "S 12° 30' 15.5\"";
        assert_eq!(pattern.numeric(DEGREES, raw).unwrap(), 12.0);
        assert_eq!(pattern.numeric(MINUTES, raw).unwrap(), 30.0);
        assert_eq!(pattern.numeric(SECONDS, raw).unwrap(), 15.5);
        assert_eq!(pattern.directional(raw).unwrap(), Some(Directional::S));
    }

    #[test]
    fn literal_regex_characters_are_escaped() {
        let pattern = CoordinatePattern::compile(
            "(%degrees%).%decimal_minutes%",
            CoordinateFormat::DegreesDecimalMinutes,
        )
        .unwrap();
        assert_eq!(pattern.numeric(DEGREES, "(45).12.5").unwrap(), 45.0);
        assert!(pattern.numeric(DEGREES, "45x12.5").is_err());
    }

    #[test]
    fn named_groups_are_supported() {
        let pattern = CoordinatePattern::compile(
            "(?P<directional>.*) (?P<degrees>.*)o (?P<decimal_minutes>.*)",
            CoordinateFormat::DegreesDecimalMinutes,
        )
        .unwrap();
        assert_eq!(pattern.numeric(DEGREES, "N 47o 16.201").unwrap(), 47.0);
        assert_eq!(pattern.numeric(DECIMAL_MINUTES, "N 47o 16.201").unwrap(), 16.201);
        assert_eq!(pattern.directional("N 47o 16.201").unwrap(), Some(Directional::N));
    }

    #[test]
    fn missing_placeholder_is_reported_at_compile_time() {
        let err = CoordinatePattern::compile(
            "%degrees% %minutes%",
            CoordinateFormat::DegreesMinutesSeconds,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            TabpipeError::MissingPlaceholder { ref placeholder, .. } if placeholder == "seconds"
        ));

        let err = CoordinatePattern::compile(
            "(?P<degrees>.*) (?P<minutes>.*)",
            CoordinateFormat::DegreesDecimalMinutes,
        )
        .unwrap_err();
        assert!(matches!(err, TabpipeError::MissingPlaceholder { .. }));
    }

    #[test]
    fn decimal_minutes_is_not_mistaken_for_minutes() {
        let pattern = CoordinatePattern::compile(
            "%degrees% %decimal_minutes%",
            CoordinateFormat::DegreesDecimalMinutes,
        )
        .unwrap();
        assert!(!pattern.has_component(MINUTES));
        assert!(!pattern.has_component(DIRECTIONAL));
        assert_eq!(pattern.directional("10 5.5").unwrap(), None);
    }

    #[test]
    fn non_matching_value_names_the_component() {
        let pattern = CoordinatePattern::compile(
            "%degrees%d %decimal_minutes%m",
            CoordinateFormat::DegreesDecimalMinutes,
        )
        .unwrap();
        let err = pattern.numeric(DEGREES, "no digits here").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Match not found for degrees"), "{message}");
        assert!(message.contains("no digits here"), "{message}");
    }
}
