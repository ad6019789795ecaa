// src/cache/job_id.rs

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

use crate::errors::{Result, TabpipeError};

static UUID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
    )
    .expect("static uuid pattern is valid")
});

/// Identifier of one job; also the name of its directory in the cache root.
///
/// Only the canonical 8-4-4-4-12 hex form is accepted because the value
/// comes from outside and ends up in a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn parse(text: &str) -> Result<Self> {
        if UUID_PATTERN.is_match(text) {
            Ok(Self(text.to_string()))
        } else {
            Err(TabpipeError::InvalidJobId(text.to_string()))
        }
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Use the caller's id when given, otherwise generate one.
    pub fn parse_or_generate(text: Option<&str>) -> Result<Self> {
        match text {
            Some(text) => Self::parse(text),
            None => Ok(Self::generate()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_canonical_uuids_in_either_case() {
        JobId::parse("a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11").unwrap();
        JobId::parse("A0EEBC99-9C0B-4EF8-BB6D-6BB9BD380A11").unwrap();
    }

    #[test]
    fn rejects_other_forms() {
        for bad in [
            "",
            "../etc",
            "a0eebc999c0b4ef8bb6d6bb9bd380a11",
            "{a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11}",
            "urn:uuid:a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11",
            "a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11\n",
            "g0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11",
        ] {
            assert!(
                matches!(JobId::parse(bad), Err(TabpipeError::InvalidJobId(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn generated_ids_round_trip() {
        let id = JobId::generate();
        assert_eq!(JobId::parse(id.as_str()).unwrap(), id);
    }
}
