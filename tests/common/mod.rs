#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::time::Duration;

pub use tabpipe_test_utils::fake_runner::{STATIONS_HEADER, STATIONS_ROWS};
pub use tabpipe_test_utils::{
    ConfigBuilder, FakeMode, SpecBuilder, TestWorkspace, init_tracing, sample_spec, with_timeout,
};

use tabpipe::engine::ExecutionEngine;
use tabpipe::status::RunState;

/// Poll `check` every 50ms until it returns true.
pub async fn eventually<F>(mut check: F)
where
    F: FnMut() -> bool,
{
    while !check() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

/// Wait until the runner has recorded a state other than idle/running.
pub async fn wait_for_terminal(engine: &ExecutionEngine, job_id: &str) -> RunState {
    loop {
        let status = engine.get_status(job_id).expect("status readable").status;
        if matches!(status, RunState::Succeeded | RunState::Failed) {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

/// Whether `pid` is a live (non-zombie) process.
#[cfg(target_os = "linux")]
pub fn process_alive(pid: u32) -> bool {
    match fs::read_to_string(format!("/proc/{pid}/stat")) {
        // The state is the first field after the parenthesised command name.
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .is_some_and(|state| state != "Z" && state != "X"),
        Err(_) => false,
    }
}

/// Pid written by the hanging fake runner for `job_id`.
pub fn read_child_pid(cache_root: &Path, job_id: &str) -> Option<u32> {
    let path = cache_root.join(".status").join(format!("{job_id}.child"));
    fs::read_to_string(path).ok()?.trim().parse().ok()
}
