use std::error::Error;
use std::fs;
use std::time::Duration;

use tabpipe::config::{Config, load_and_validate, load_or_default};
use tabpipe::errors::TabpipeError;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn full_file_is_loaded_and_validated() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("Tabpipe.toml");
    fs::write(
        &path,
        r#"
[cache]
root = "jobs"
retention = "7d"

[runner]
executable = "/usr/local/bin/dpp"
processor_path = "/opt/processors"
poll_interval = "250ms"
kill_grace = "5s"

[runner.versions."v2.1.0"]
executable = "/home/virtualenvs/v2.1.0/bin/dpp"
processor_path = "/home/virtualenvs/v2.1.0/processors"
"#,
    )?;

    let config = load_and_validate(&path)?;
    assert_eq!(config.cache.root, dir.path().join("jobs"));
    assert_eq!(config.cache.retention, Duration::from_secs(7 * 24 * 60 * 60));
    assert_eq!(config.runner.default.executable, "/usr/local/bin/dpp");
    assert_eq!(config.runner.poll_interval, Duration::from_millis(250));
    assert_eq!(config.runner.kill_grace, Duration::from_secs(5));
    assert_eq!(config.runner.search_path_var, "DPP_PROCESSOR_PATH");

    let v2 = &config.runner.versions["v2.1.0"];
    assert_eq!(v2.executable, "/home/virtualenvs/v2.1.0/bin/dpp");
    assert_eq!(
        v2.processor_path,
        std::path::PathBuf::from("/home/virtualenvs/v2.1.0/processors")
    );
    Ok(())
}

#[test]
fn absolute_root_is_kept() -> TestResult {
    let dir = TempDir::new()?;
    let root = dir.path().join("elsewhere");
    let path = dir.path().join("Tabpipe.toml");
    fs::write(&path, format!("[cache]\nroot = {:?}\n", root))?;

    let config = load_and_validate(&path)?;
    assert_eq!(config.cache.root, root);
    Ok(())
}

#[test]
fn bad_duration_is_a_config_error() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("Tabpipe.toml");
    fs::write(&path, "[cache]\nretention = \"forever\"\n")?;

    match load_and_validate(&path) {
        Err(TabpipeError::Config(message)) => assert!(message.contains("retention"), "{message}"),
        other => panic!("expected a config error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn unknown_toml_syntax_is_rejected() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("Tabpipe.toml");
    fs::write(&path, "[cache\nroot = 1")?;

    assert!(matches!(load_and_validate(&path), Err(TabpipeError::Toml(_))));
    Ok(())
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    assert!(load_and_validate(dir.path().join("absent.toml")).is_err());
}

#[test]
fn missing_default_file_falls_back_to_defaults() -> TestResult {
    let dir = TempDir::new()?;
    let config = load_or_default(dir.path().join("Tabpipe.toml"))?;
    let defaults = Config::default();

    assert_eq!(config.cache.root, defaults.cache.root);
    assert_eq!(config.cache.retention, Duration::from_secs(30 * 24 * 60 * 60));
    assert_eq!(config.runner.default.executable, "dpp");
    assert_eq!(config.runner.status_dir_var, "TABPIPE_STATUS_DIR");
    assert!(config.runner.versions.is_empty());
    Ok(())
}
