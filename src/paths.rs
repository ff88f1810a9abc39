use std::{ffi::OsString, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Neither XDG_DATA_HOME nor HOME is set, cannot locate the data file")]
    NoDataDir,

    #[error("XDG_RUNTIME_DIR is not set, cannot create the lock file")]
    NoRuntimeDir,
}

/// `${XDG_DATA_HOME:-$HOME/.local/share}/<app_name>.json`
pub fn data_file(
    app_name: &str,
    env: impl Fn(&str) -> Option<OsString>,
) -> Result<PathBuf, ConfigError> {
    let data_dir = match non_empty(&env, "XDG_DATA_HOME") {
        Some(dir) => PathBuf::from(dir),
        None => non_empty(&env, "HOME")
            .map(|home| PathBuf::from(home).join(".local").join("share"))
            .ok_or(ConfigError::NoDataDir)?,
    };

    Ok(data_dir.join(format!("{app_name}.json")))
}

/// `${XDG_RUNTIME_DIR}/<app_name>.lock`
pub fn lock_file(
    app_name: &str,
    env: impl Fn(&str) -> Option<OsString>,
) -> Result<PathBuf, ConfigError> {
    non_empty(&env, "XDG_RUNTIME_DIR")
        .map(|dir| PathBuf::from(dir).join(format!("{app_name}.lock")))
        .ok_or(ConfigError::NoRuntimeDir)
}

pub fn process_env(key: &str) -> Option<OsString> {
    std::env::var_os(key)
}

fn non_empty(env: &impl Fn(&str) -> Option<OsString>, key: &str) -> Option<OsString> {
    env(key).filter(|value| !value.is_empty())
}
