//! A stand-in for the external pipeline runner.
//!
//! The fake is a POSIX `sh` script invoked exactly like the real runner
//! (`<exe> run [--verbose] ./<job_id>/<name>` from inside the cache root).
//! It writes status records into `$TABPIPE_STATUS_DIR` and results into
//! `<job_id>/results/`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

/// How the fake runner behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeMode {
    /// Record a start, write a datapackage plus one CSV resource, succeed.
    Succeed,
    /// Record a start, then a failed execution with a framed error block.
    Fail,
    /// Record a start, then block (with a child `sleep`) until killed.
    /// The pid of the child is written to `$TABPIPE_STATUS_DIR/<job>.child`.
    Hang,
    /// Like `Hang`, but the runner and its child ignore SIGTERM, so only
    /// SIGKILL stops them.
    IgnoreTerm,
    /// Exit non-zero without recording anything.
    NeverStart,
    /// Succeed, but leave a non-CSV file in the results.
    NonCsvResult,
}

impl FakeMode {
    fn file_name(self) -> &'static str {
        match self {
            FakeMode::Succeed => "fake-runner-succeed.sh",
            FakeMode::Fail => "fake-runner-fail.sh",
            FakeMode::Hang => "fake-runner-hang.sh",
            FakeMode::IgnoreTerm => "fake-runner-ignore-term.sh",
            FakeMode::NeverStart => "fake-runner-never-start.sh",
            FakeMode::NonCsvResult => "fake-runner-non-csv.sh",
        }
    }

    fn body(self) -> &'static str {
        match self {
            FakeMode::Succeed => SUCCEED,
            FakeMode::Fail => FAIL,
            FakeMode::Hang => HANG,
            FakeMode::IgnoreTerm => IGNORE_TERM,
            FakeMode::NeverStart => NEVER_START,
            FakeMode::NonCsvResult => NON_CSV,
        }
    }
}

/// Header of the CSV resource the fake runner produces.
pub const STATIONS_HEADER: [&str; 3] = ["station", "lat", "lat_dd"];
/// Number of data rows in that resource.
pub const STATIONS_ROWS: usize = 3;

const PRELUDE: &str = r#"#!/bin/sh
for pipeline; do :; done
job=$(echo "$pipeline" | cut -d/ -f2)
name=$(echo "$pipeline" | cut -d/ -f3)
status_file="$TABPIPE_STATUS_DIR/$job.json"

now() {
    printf '%s.%09dZ' "$(date -u +%Y-%m-%dT%H:%M:%S)" "$$"
}

write_status() {
    mkdir -p "$TABPIPE_STATUS_DIR"
    printf '%s' "$1" > "$status_file.tmp" && mv "$status_file.tmp" "$status_file"
}

start=$(now)
"#;

const RECORD_START: &str = r#"write_status "{\"start_time\": \"$start\"}"
"#;

const WRITE_RESULTS: &str = r#"mkdir -p "$job/results/data"
printf '{"name": "%s", "resources": [{"name": "stations", "path": "data/stations.csv"}]}' "$name" > "$job/results/datapackage.json"
printf 'station,lat,lat_dd\nA,N 47o 16.201,47.27001666666667\nB,S 10o 30,-10.5\nC,N 1o 0,1.0\n' > "$job/results/data/stations.csv"
"#;

const RECORD_SUCCESS: &str = r#"write_status "{\"start_time\": \"$start\", \"finish_time\": \"$(now)\", \"success\": true, \"error_log\": []}"
exit 0
"#;

const SUCCEED: &str = "";
const FAIL: &str = r#"echo "INFO :Main:RUNNING $pipeline" >&2
write_status "{\"start_time\": \"$start\", \"finish_time\": \"$(now)\", \"success\": false, \"error_log\": [\"INFO :Main:RUNNING $pipeline\", \"ERROR log from processor sort:\", \"+--------\", \"| ValueError: sort-by field missing\", \"+--------\", \"INFO :Main:FAILED $pipeline\"]}"
exit 1
"#;
const HANG: &str = r#"sleep 30 &
echo $! > "$TABPIPE_STATUS_DIR/$job.child"
wait
"#;
// An ignored signal stays ignored across exec, so `sleep` inherits it.
const IGNORE_TERM: &str = r#"trap '' TERM
sleep 30 &
echo $! > "$TABPIPE_STATUS_DIR/$job.child"
wait
"#;
const NEVER_START: &str = r#"echo "runner: cannot load processors from $DPP_PROCESSOR_PATH" >&2
exit 3
"#;
const NON_CSV: &str = r#"printf '{}' > "$job/results/data/extra.json"
"#;

fn script(mode: FakeMode) -> String {
    let mut script = String::from(PRELUDE);
    match mode {
        FakeMode::NeverStart => {}
        _ => script.push_str(RECORD_START),
    }
    match mode {
        FakeMode::Succeed | FakeMode::NonCsvResult => {
            script.push_str(WRITE_RESULTS);
            script.push_str(mode.body());
            script.push_str(RECORD_SUCCESS);
        }
        FakeMode::Fail | FakeMode::Hang | FakeMode::IgnoreTerm | FakeMode::NeverStart => {
            script.push_str(mode.body())
        }
    }
    script
}

/// Write the fake runner for `mode` into `dir` and make it executable.
pub fn install_fake_runner(dir: &Path, mode: FakeMode) -> anyhow::Result<PathBuf> {
    let path = dir.join(mode.file_name());
    fs::write(&path, script(mode)).with_context(|| format!("writing {:?}", path))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .with_context(|| format!("chmod {:?}", path))?;
    }

    debug!(?path, ?mode, "installed fake runner");
    Ok(path)
}
