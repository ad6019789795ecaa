// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::model::{Config, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw model.
///
/// This only performs TOML deserialization; durations and other invariants
/// are checked by [`load_and_validate`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading config file at {:?}", path))?;

    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// A relative `[cache].root` is resolved against the directory holding the
/// config file, so the same file works regardless of the caller's cwd.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let raw = load_from_path(path)?;
    let mut config = Config::try_from(raw)?;

    if config.cache.root.is_relative() {
        config.cache.root = config_root_dir(path).join(&config.cache.root);
    }
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to built-in defaults.
///
/// Used for the default config location, which is optional.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if path.exists() {
        load_and_validate(path)
    } else {
        Ok(Config::default())
    }
}

/// Helper to resolve a default config path.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Tabpipe.toml")
}

/// Directory holding the config file; a bare filename resolves to ".".
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
