//! Resolution of setting values: flag > environment > active profile > default.

use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::warn;

use super::ConfigError;
use super::file::ConfigFile;
use super::keys::{self, SettingKey};
use super::profile::validate_profile_name;
use crate::print::{Level, OutputFormat};
use stackit_shared::duration::convert_to_seconds;

/// Selects a profile for one invocation without activating it.
pub const PROFILE_ENV: &str = "STACKIT_CLI_PROFILE";

/// Snapshot of the process environment taken at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment(BTreeMap<String, String>);

impl Environment {
    pub fn capture() -> Self {
        Self(std::env::vars().collect())
    }

    pub fn from_pairs<K: Into<String>, V: Into<String>>(
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Value of `name`; empty values count as unset.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Flag,
    Env,
    Profile,
    Default,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Flag => "flag",
            Source::Env => "env",
            Source::Profile => "profile",
            Source::Default => "default",
        }
    }
}

/// Settings snapshot used for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    file: ConfigFile,
    profile: String,
    env: Environment,
    flags: BTreeMap<String, String>,
}

impl Settings {
    pub fn new(file: ConfigFile, env: Environment) -> Result<Self, ConfigError> {
        let profile = match env.get(PROFILE_ENV) {
            Some(name) => {
                validate_profile_name(name)?;
                if !file.profiles.contains_key(name) {
                    return Err(ConfigError::ProfileNotFound(name.to_string()));
                }
                name.to_string()
            }
            None => file.active_profile.clone(),
        };
        Ok(Self {
            file,
            profile,
            env,
            flags: BTreeMap::new(),
        })
    }

    /// Record an explicitly passed flag for `key`.
    pub fn with_flag(mut self, key: &str, value: impl Into<String>) -> Self {
        self.flags.insert(key.to_string(), value.into());
        self
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn file(&self) -> &ConfigFile {
        &self.file
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Value and where it came from. Unknown keys resolve to nothing.
    pub fn resolve(&self, key: &str) -> Option<(String, Source)> {
        let setting = keys::lookup(key)?;
        if let Some(value) = self.flags.get(key) {
            return Some((value.clone(), Source::Flag));
        }
        if let Some(value) = self.env.get(&setting.env_var()) {
            return Some((value.to_string(), Source::Env));
        }
        if let Some(value) = self
            .file
            .profiles
            .get(&self.profile)
            .and_then(|values| values.get(key))
        {
            return Some((value.clone(), Source::Profile));
        }
        setting.default.map(|d| (d.to_string(), Source::Default))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.resolve(key).map(|(value, _)| value)
    }

    /// Keys with a value other than the baked-in default.
    pub fn configured(&self) -> Vec<(SettingKey, String, Source)> {
        keys::catalog()
            .into_iter()
            .filter_map(|key| {
                let (value, source) = self.resolve(&key.name)?;
                (source != Source::Default).then_some((key, value, source))
            })
            .collect()
    }

    pub fn project_id(&self) -> Option<String> {
        self.get(keys::PROJECT_ID)
    }

    pub fn region(&self) -> String {
        self.get(keys::REGION)
            .unwrap_or_else(|| keys::DEFAULT_REGION.to_string())
    }

    pub fn output_format(&self) -> OutputFormat {
        self.typed(keys::OUTPUT_FORMAT)
    }

    pub fn verbosity(&self) -> Level {
        self.typed(keys::VERBOSITY)
    }

    pub fn assume_yes(&self) -> bool {
        self.bool(keys::ASSUME_YES)
    }

    pub fn is_async(&self) -> bool {
        self.bool(keys::ASYNC)
    }

    pub fn session_time_limit(&self) -> chrono::Duration {
        let raw = self
            .get(keys::SESSION_TIME_LIMIT)
            .unwrap_or_else(|| keys::DEFAULT_SESSION_TIME_LIMIT.to_string());
        match convert_to_seconds(&raw).map(i64::try_from) {
            Ok(Ok(seconds)) => chrono::Duration::seconds(seconds),
            _ => {
                warn!("ignoring invalid session time limit {:?}", raw);
                chrono::Duration::hours(12)
            }
        }
    }

    pub fn custom_endpoint(&self, service: &str) -> Option<String> {
        self.get(&keys::custom_endpoint_key(service))
    }

    fn bool(&self, key: &str) -> bool {
        matches!(
            self.get(key).map(|v| v.to_ascii_lowercase()).as_deref(),
            Some("true" | "1")
        )
    }

    fn typed<T: FromStr + Default>(&self, key: &str) -> T {
        match self.get(key) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("ignoring invalid value {:?} for {}", raw, key);
                T::default()
            }),
            None => T::default(),
        }
    }
}
