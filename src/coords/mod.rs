// src/coords/mod.rs

//! Coordinate normalization.
//!
//! Free-form coordinate strings ("N 47o 16.201", "W 127o 35 57", ...) are
//! matched against a [`CoordinatePattern`] and folded into signed decimal
//! degrees.
//!
//! - [`pattern`] compiles templates and named-group patterns.
//! - [`directional`] parses hemisphere indicators.
//! - [`processor`] applies the conversion to dataset rows.

pub mod directional;
pub mod pattern;
pub mod processor;

use tracing::trace;

use crate::errors::{Result, TabpipeError};
use crate::types::CoordinateFormat;

pub use directional::Directional;
pub use pattern::CoordinatePattern;
pub use processor::{ConvertToDecimalDegrees, CoordinateField, ConvertConfig, ResourceMatcher};

/// Convert `raw` to signed decimal degrees.
///
/// `directional_override` wins over any directional found in `raw`. The
/// hemisphere only flips the sign of a non-negative value, so a negative
/// degrees value paired with `W`/`S` stays negative and one paired with
/// `E`/`N` also stays negative.
pub fn normalize(
    pattern: &CoordinatePattern,
    raw: &str,
    directional_override: Option<Directional>,
) -> Result<f64> {
    let degrees = pattern.numeric(pattern::DEGREES, raw)?;
    let decimal_minutes = match pattern.format() {
        CoordinateFormat::DegreesMinutesSeconds => {
            let minutes = pattern.numeric(pattern::MINUTES, raw)?;
            let seconds = pattern.numeric(pattern::SECONDS, raw)?;
            if seconds >= 60.0 {
                return Err(TabpipeError::Parse(format!(
                    "Seconds are greater than 60: {seconds}"
                )));
            }
            minutes + seconds / 60.0
        }
        CoordinateFormat::DegreesDecimalMinutes => {
            pattern.numeric(pattern::DECIMAL_MINUTES, raw)?
        }
    };
    if decimal_minutes >= 60.0 {
        return Err(TabpipeError::Parse(format!(
            "Decimal minutes are greater than 60: {decimal_minutes}"
        )));
    }

    let directional = match directional_override {
        Some(d) => Some(d),
        None => pattern.directional(raw)?,
    };

    let mut decimal_degrees = if degrees < 0.0 {
        degrees - decimal_minutes / 60.0
    } else {
        degrees + decimal_minutes / 60.0
    };
    if directional.is_some_and(Directional::is_negative) && decimal_degrees >= 0.0 {
        decimal_degrees = -decimal_degrees;
    }

    trace!(raw, pattern = pattern.as_str(), ?directional, decimal_degrees, "normalized coordinate");
    Ok(decimal_degrees)
}

/// Compile `pattern` and normalize a single value.
pub fn normalize_str(
    pattern: &str,
    format: CoordinateFormat,
    raw: &str,
    directional_override: Option<Directional>,
) -> Result<f64> {
    normalize(&CoordinatePattern::compile(pattern, format)?, raw, directional_override)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DM_NAMED: &str = "(?P<directional>.*) (?P<degrees>.*)o (?P<decimal_minutes>.*)";
    const DMS_NAMED: &str = "(?P<directional>.*) (?P<degrees>.*)o (?P<minutes>.*) (?P<seconds>.*)";

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn degrees_decimal_minutes_north() {
        let v = normalize_str(DM_NAMED, CoordinateFormat::DegreesDecimalMinutes, "N 47o 16.201", None)
            .unwrap();
        assert!(close(v, 47.0 + 16.201 / 60.0), "{v}");
        assert!(v > 47.27 && v < 47.271);
    }

    #[test]
    fn degrees_minutes_seconds_west() {
        let v = normalize_str(DMS_NAMED, CoordinateFormat::DegreesMinutesSeconds, "W 127o 35 57", None)
            .unwrap();
        assert!(close(v, -(127.0 + (35.0 + 57.0 / 60.0) / 60.0)), "{v}");
    }

    #[test]
    fn template_form_gives_the_same_answer() {
        let v = normalize_str(
            "%directional% %degrees%o %minutes% %seconds%",
            CoordinateFormat::DegreesMinutesSeconds,
            "W 127o 35 57",
            None,
        )
        .unwrap();
        assert!(close(v, -127.599_166_666_666_67), "{v}");
    }

    #[test]
    fn out_of_range_components_are_rejected() {
        let err = normalize_str(DMS_NAMED, CoordinateFormat::DegreesMinutesSeconds, "N 10o 5 61", None)
            .unwrap_err();
        assert!(err.to_string().contains("Seconds are greater than 60"), "{err}");

        let err = normalize_str(DM_NAMED, CoordinateFormat::DegreesDecimalMinutes, "N 10o 60.5", None)
            .unwrap_err();
        assert!(err.to_string().contains("Decimal minutes are greater than 60"), "{err}");
    }

    #[test]
    fn southern_synonyms_flip_the_sign() {
        for word in ["South", "s", "SOUTH", "S"] {
            let raw = format!("{word} 10o 30");
            let v = normalize_str(DM_NAMED, CoordinateFormat::DegreesDecimalMinutes, &raw, None)
                .unwrap();
            assert!(close(v, -10.5), "{word}: {v}");
        }
    }

    #[test]
    fn override_beats_extracted_directional() {
        let pattern =
            CoordinatePattern::compile(DM_NAMED, CoordinateFormat::DegreesDecimalMinutes).unwrap();
        let v = normalize(&pattern, "N 10o 30", Some(Directional::W)).unwrap();
        assert!(close(v, -10.5));
    }

    #[test]
    fn negative_degrees_are_not_flipped_back() {
        let pattern =
            CoordinatePattern::compile("(?P<degrees>.*) (?P<decimal_minutes>.*)", CoordinateFormat::DegreesDecimalMinutes)
                .unwrap();
        let west = normalize(&pattern, "-10 30", Some(Directional::W)).unwrap();
        assert!(close(west, -10.5));
        let east = normalize(&pattern, "-10 30", Some(Directional::E)).unwrap();
        assert!(close(east, -10.5));
    }

    #[test]
    fn unknown_directional_is_a_parse_error() {
        let err = normalize_str(DM_NAMED, CoordinateFormat::DegreesDecimalMinutes, "X 10o 30", None)
            .unwrap_err();
        assert!(matches!(err, TabpipeError::Parse(_)));
    }

    proptest! {
        #[test]
        fn dms_stays_within_one_degree(
            degrees in 0u32..180,
            minutes in 0u32..60,
            seconds in 0u32..60,
            south in any::<bool>(),
        ) {
            let hemisphere = if south { "S" } else { "N" };
            let raw = format!("{hemisphere} {degrees}o {minutes} {seconds}");
            let v = normalize_str(DMS_NAMED, CoordinateFormat::DegreesMinutesSeconds, &raw, None).unwrap();

            prop_assert!(v.abs() >= degrees as f64);
            prop_assert!(v.abs() < degrees as f64 + 1.0);
            if degrees + minutes + seconds > 0 {
                prop_assert_eq!(v < 0.0, south);
            }
        }
    }
}
