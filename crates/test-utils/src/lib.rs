pub mod builders;
pub mod fake_runner;

use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Duration;

use tempfile::TempDir;
use tracing_subscriber::{EnvFilter, fmt};

use tabpipe::config::Config;
use tabpipe::engine::ExecutionEngine;

pub use builders::{ConfigBuilder, SpecBuilder, sample_spec};
pub use fake_runner::{FakeMode, install_fake_runner};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Run a future with a 20-second timeout. Runner processes are real child
/// processes, so this is more generous than a pure in-memory test needs.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(20), f)
        .await
        .expect("Test timed out after 20 seconds")
}

/// A scratch directory holding a cache root and the fake runner scripts.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Cache root used by engines built from this workspace.
    pub fn cache_root(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    /// Install a fake runner behaving as `mode`.
    pub fn runner(&self, mode: FakeMode) -> PathBuf {
        install_fake_runner(self.dir.path(), mode).expect("install fake runner")
    }

    /// Config with fast polling that runs `mode` for every pipeline.
    pub fn config(&self, mode: FakeMode) -> Config {
        ConfigBuilder::new(&self.cache_root())
            .executable(&self.runner(mode))
            .build()
    }

    pub fn engine(&self, mode: FakeMode) -> ExecutionEngine {
        ExecutionEngine::from_config(&self.config(mode)).expect("build engine")
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
