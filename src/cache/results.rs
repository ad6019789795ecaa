// src/cache/results.rs

//! Reading a finished job's dataset back out of its results directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::cache::{CacheStore, JobId, METADATA_FILE};
use crate::errors::{Result, TabpipeError};

/// Header and (possibly truncated) rows of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceData {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Everything `getData` returns for a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineData {
    pub job_id: JobId,
    /// Derived spec text, `None` once the job directory lost it.
    #[serde(rename = "yaml")]
    pub spec_text: Option<String>,
    #[serde(rename = "datapackage")]
    pub dataset_metadata: JsonValue,
    pub resources: BTreeMap<String, ResourceData>,
}

impl CacheStore {
    /// Read the dataset metadata and every resource under `results/`.
    ///
    /// At most `limit_rows` rows are returned per resource; a negative limit
    /// returns all rows. Any file other than the metadata file must be a CSV.
    pub fn read_results(&self, job_id: &JobId, limit_rows: i64) -> Result<PipelineData> {
        let spec_text = self.read_spec_text(job_id)?;
        let results = self.results_dir(job_id);

        let mut dataset_metadata = JsonValue::Object(Default::default());
        let mut resources = BTreeMap::new();

        if results.is_dir() {
            let metadata_path = results.join(METADATA_FILE);
            if metadata_path.is_file() {
                let text = fs::read_to_string(&metadata_path)
                    .with_context(|| format!("reading {:?}", metadata_path))?;
                dataset_metadata = serde_json::from_str(&text)?;
            }

            for path in list_files(&results)? {
                if path.file_name().and_then(|n| n.to_str()) == Some(METADATA_FILE) {
                    continue;
                }
                if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                    return Err(TabpipeError::UnsupportedFormat(
                        path.strip_prefix(&results).unwrap_or(&path).display().to_string(),
                    ));
                }
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                resources.insert(name, read_csv(&path, limit_rows)?);
            }
        }

        Ok(PipelineData {
            job_id: job_id.clone(),
            spec_text,
            dataset_metadata,
            resources,
        })
    }
}

/// All regular files below `dir`, sorted for stable output.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current).with_context(|| format!("reading dir {:?}", current))? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn read_csv(path: &Path, limit_rows: i64) -> Result<ResourceData> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut records = reader.records();

    let header = match records.next() {
        Some(record) => record?.iter().map(str::to_string).collect(),
        None => Vec::new(),
    };

    let limit = usize::try_from(limit_rows).ok();
    let mut rows = Vec::new();
    for record in records {
        if limit.is_some_and(|limit| rows.len() >= limit) {
            break;
        }
        rows.push(record?.iter().map(str::to_string).collect());
    }

    Ok(ResourceData { header, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with_results(files: &[(&str, &str)]) -> (TempDir, CacheStore, JobId) {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::new(tmp.path());
        let id = JobId::generate();
        let results = store.results_dir(&id);
        for (name, contents) in files {
            let path = results.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
        (tmp, store, id)
    }

    #[test]
    fn reads_metadata_and_nested_resources() {
        let (_tmp, store, id) = store_with_results(&[
            ("datapackage.json", r#"{"name": "p", "resources": []}"#),
            ("data/lat.csv", "Lat,Lon\n1,2\n3,4\n5,6\n"),
        ]);
        let data = store.read_results(&id, -1).unwrap();
        assert_eq!(data.dataset_metadata["name"], "p");
        let lat = &data.resources["lat"];
        assert_eq!(lat.header, ["Lat", "Lon"]);
        assert_eq!(lat.rows.len(), 3);
        assert_eq!(data.spec_text, None);
    }

    #[test]
    fn limits_rows_per_resource() {
        let (_tmp, store, id) = store_with_results(&[("a.csv", "x\n1\n2\n3\n")]);
        assert_eq!(store.read_results(&id, 2).unwrap().resources["a"].rows.len(), 2);
        assert_eq!(store.read_results(&id, 0).unwrap().resources["a"].rows.len(), 0);
        assert_eq!(store.read_results(&id, 10).unwrap().resources["a"].rows.len(), 3);
    }

    #[test]
    fn rejects_non_csv_output() {
        let (_tmp, store, id) = store_with_results(&[("a.json", "[]")]);
        match store.read_results(&id, -1) {
            Err(TabpipeError::UnsupportedFormat(name)) => assert_eq!(name, "a.json"),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn missing_results_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::new(tmp.path());
        let data = store.read_results(&JobId::generate(), -1).unwrap();
        assert!(data.resources.is_empty());
        assert!(data.dataset_metadata.as_object().unwrap().is_empty());
    }
}
