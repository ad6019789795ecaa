// src/cache/mod.rs

//! On-disk job cache.
//!
//! Every job owns one directory under the cache root:
//!
//! ```text
//! root/{job_id}/pipeline-spec.yaml.original   caller's steps, for inspection
//! root/{job_id}/pipeline-spec.yaml            derived spec the runner executes
//! root/{job_id}/results/datapackage.json
//! root/{job_id}/results/**/<resource>.csv
//! ```
//!
//! Other tools read this layout directly; renaming anything here is a
//! breaking change.

pub mod gc;
pub mod job_id;
pub mod results;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::errors::Result;
use crate::spec::PipelineSpec;

pub use gc::GcReport;
pub use job_id::JobId;
pub use results::{PipelineData, ResourceData};

pub const ORIGINAL_SPEC_FILE: &str = "pipeline-spec.yaml.original";
pub const SPEC_FILE: &str = "pipeline-spec.yaml";
pub const RESULTS_DIR: &str = "results";
pub const METADATA_FILE: &str = "datapackage.json";

/// Maps job ids to their directories under a single cache root.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn job_dir(&self, job_id: &JobId) -> PathBuf {
        self.root.join(job_id.as_str())
    }

    pub fn original_spec_path(&self, job_id: &JobId) -> PathBuf {
        self.job_dir(job_id).join(ORIGINAL_SPEC_FILE)
    }

    pub fn spec_path(&self, job_id: &JobId) -> PathBuf {
        self.job_dir(job_id).join(SPEC_FILE)
    }

    pub fn results_dir(&self, job_id: &JobId) -> PathBuf {
        self.job_dir(job_id).join(RESULTS_DIR)
    }

    /// Create the job directory (and the cache root) if missing.
    pub fn prepare(&self, job_id: &JobId) -> Result<PathBuf> {
        let dir = self.job_dir(job_id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating job directory {:?}", dir))?;
        Ok(dir)
    }

    /// Write the original and derived specs, then drop stale results.
    ///
    /// The original goes first: a derived spec on disk always has its
    /// original next to it.
    pub fn write_specs(&self, job_id: &JobId, spec: &PipelineSpec) -> Result<()> {
        let original = self.original_spec_path(job_id);
        fs::write(&original, spec.to_yaml()?)
            .with_context(|| format!("writing {:?}", original))?;

        let results = self.results_dir(job_id);
        let derived = self.spec_path(job_id);
        fs::write(&derived, spec.to_yaml_with(&spec.with_dump_step(&results))?)
            .with_context(|| format!("writing {:?}", derived))?;

        remove_dir_if_exists(&results)?;
        debug!(job_id = %job_id, dir = ?self.job_dir(job_id), "pipeline specs written");
        Ok(())
    }

    /// Whether the derived spec is still present (the cancellation sentinel).
    pub fn spec_exists(&self, job_id: &JobId) -> bool {
        self.spec_path(job_id).is_file()
    }

    /// Text of the derived spec, if the job still has one.
    pub fn read_spec_text(&self, job_id: &JobId) -> Result<Option<String>> {
        match fs::read_to_string(self.spec_path(job_id)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the sentinel, which asks a running job to stop.
    pub fn remove_spec(&self, job_id: &JobId) -> Result<bool> {
        match fs::remove_file(self.spec_path(job_id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Unconditionally remove the job directory.
    pub fn delete(&self, job_id: &JobId) -> Result<()> {
        let dir = self.job_dir(job_id);
        fs::remove_dir_all(&dir).with_context(|| format!("removing job directory {:?}", dir))?;
        debug!(job_id = %job_id, "job directory removed");
        Ok(())
    }

    /// Remove the job directory if it is still there.
    pub fn delete_if_exists(&self, job_id: &JobId) -> Result<bool> {
        let dir = self.job_dir(job_id);
        if !dir.exists() {
            return Ok(false);
        }
        remove_dir_if_exists(&dir)?;
        Ok(true)
    }
}

fn remove_dir_if_exists(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::Step;
    use tempfile::TempDir;

    fn spec() -> PipelineSpec {
        let mut spec = PipelineSpec::new("p", "P", "", "").unwrap();
        spec.add_step(Step::new("infer_types")).unwrap();
        spec
    }

    #[test]
    fn layout_is_stable() {
        let store = CacheStore::new("/cache");
        let id = JobId::parse("a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11").unwrap();
        assert_eq!(
            store.original_spec_path(&id),
            PathBuf::from("/cache/a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11/pipeline-spec.yaml.original")
        );
        assert_eq!(
            store.spec_path(&id),
            PathBuf::from("/cache/a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11/pipeline-spec.yaml")
        );
        assert_eq!(
            store.results_dir(&id),
            PathBuf::from("/cache/a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11/results")
        );
    }

    #[test]
    fn write_specs_writes_both_and_clears_results() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::new(tmp.path());
        let id = JobId::generate();
        store.prepare(&id).unwrap();

        let stale = store.results_dir(&id).join("old.csv");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, "a\n1\n").unwrap();

        store.write_specs(&id, &spec()).unwrap();

        let original = fs::read_to_string(store.original_spec_path(&id)).unwrap();
        let derived = store.read_spec_text(&id).unwrap().unwrap();
        assert!(!original.contains("dump_to_path"));
        assert!(derived.contains("dump_to_path"));
        assert!(derived.contains(&*store.results_dir(&id).to_string_lossy()));
        assert!(!store.results_dir(&id).exists());
    }

    #[test]
    fn remove_spec_and_delete() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::new(tmp.path());
        let id = JobId::generate();
        store.prepare(&id).unwrap();
        store.write_specs(&id, &spec()).unwrap();

        assert!(store.spec_exists(&id));
        assert!(store.remove_spec(&id).unwrap());
        assert!(!store.remove_spec(&id).unwrap());
        assert!(!store.spec_exists(&id));
        assert_eq!(store.read_spec_text(&id).unwrap(), None);

        store.delete(&id).unwrap();
        assert!(!store.job_dir(&id).exists());
        assert!(store.delete(&id).is_err());
        assert!(!store.delete_if_exists(&id).unwrap());
    }
}
