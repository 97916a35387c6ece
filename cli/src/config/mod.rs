//! Persisted, non-secret configuration.
//!
//! - `keys`: the closed catalog of setting keys and their validators
//! - `file`: the TOML document and its atomic, locked persistence
//! - `profile`: named profile management
//! - `settings`: per-invocation resolution across flags, env and profile

mod file;
pub mod keys;
mod profile;
mod settings;


use std::path::PathBuf;
use thiserror::Error;

#[cfg(test)]
pub use file::ConfigFile;
pub use file::{CONFIG_DIR_ENV, ConfigStore};
pub use settings::{Environment, PROFILE_ENV, Settings, Source};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {} is corrupt: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("write config file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialize config: {0}")]
    Serialize(String),

    #[error("could not determine the user config directory")]
    NoConfigDir,

    #[error("unknown configuration key {0:?}")]
    UnknownKey(String),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("the profile name {0:?} is invalid, it must match ^[a-z0-9-]+$")]
    InvalidProfileName(String),

    #[error("profile {0:?} does not exist")]
    ProfileNotFound(String),

    #[error("profile {0:?} already exists")]
    ProfileExists(String),

    #[error("the default profile cannot be deleted")]
    CannotDeleteDefault,

    #[error("invalid profile document: {0}")]
    InvalidImport(String),
}

impl ConfigError {
    /// Failures caused by user input rather than the environment.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            ConfigError::UnknownKey(_)
                | ConfigError::InvalidValue { .. }
                | ConfigError::InvalidProfileName(_)
                | ConfigError::CannotDeleteDefault
        )
    }
}
