// src/cache/gc.rs

//! Time-based cleanup of the cache root.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use crate::cache::CacheStore;

/// What a garbage-collection sweep did.
#[derive(Debug, Default)]
pub struct GcReport {
    pub removed: Vec<PathBuf>,
    /// Entries that could not be inspected or removed, with the reason.
    pub errors: Vec<(PathBuf, String)>,
}

impl GcReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

impl CacheStore {
    /// Remove every entry of the cache root older than `retention`.
    ///
    /// Age is taken from the entry's modification time. Hidden entries
    /// (leading `.`) are never touched; the status store lives there.
    /// A failure on one entry is recorded and the sweep continues.
    pub fn collect_garbage(&self, retention: Duration) -> GcReport {
        let mut report = GcReport::default();
        let now = SystemTime::now();

        let entries = match fs::read_dir(self.root()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return report,
            Err(e) => {
                report.errors.push((self.root().to_path_buf(), e.to_string()));
                return report;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    report.errors.push((self.root().to_path_buf(), e.to_string()));
                    continue;
                }
            };
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }

            let path = entry.path();
            let modified = match entry.metadata().and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    report.errors.push((path, e.to_string()));
                    continue;
                }
            };
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age <= retention {
                continue;
            }

            debug!(?path, age_secs = age.as_secs(), "removing stale cache entry");
            let removed = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match removed {
                Ok(()) => report.removed.push(path),
                Err(e) => report.errors.push((path, e.to_string())),
            }
        }

        if !report.removed.is_empty() {
            info!(removed = report.removed.len(), "garbage collected stale jobs");
        }
        for (path, error) in report.errors.iter() {
            warn!(?path, %error, "there was an error trying to clean up a cache entry");
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn age_dir(path: &std::path::Path, by: Duration) {
        File::open(path)
            .unwrap()
            .set_modified(SystemTime::now() - by)
            .unwrap();
    }

    #[test]
    fn removes_only_entries_older_than_retention() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::new(tmp.path());
        let old = tmp.path().join("old");
        let fresh = tmp.path().join("fresh");
        let hidden = tmp.path().join(".status");
        for dir in [&old, &fresh, &hidden] {
            fs::create_dir_all(dir.join("results")).unwrap();
        }
        age_dir(&old, Duration::from_secs(3600 * 48));
        age_dir(&hidden, Duration::from_secs(3600 * 48));

        let report = store.collect_garbage(Duration::from_secs(3600 * 24));

        assert!(report.is_clean());
        assert_eq!(report.removed, vec![old.clone()]);
        assert!(!old.exists());
        assert!(fresh.exists());
        assert!(hidden.exists());
    }

    #[test]
    fn missing_root_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::new(tmp.path().join("nope"));
        let report = store.collect_garbage(Duration::ZERO);
        assert!(report.is_clean());
        assert!(report.removed.is_empty());
    }
}
