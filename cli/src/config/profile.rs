//! Named profile management.

use regex::Regex;
use std::sync::LazyLock;

use super::ConfigError;
use super::file::{ConfigFile, ProfileValues};
use super::keys;
use stackit_shared::auth::DEFAULT_PROFILE;

static PROFILE_NAME_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new("^[a-z0-9-]+$"));

pub fn validate_profile_name(name: &str) -> Result<(), ConfigError> {
    match PROFILE_NAME_PATTERN.as_ref() {
        Ok(pattern) if pattern.is_match(name) => Ok(()),
        _ => Err(ConfigError::InvalidProfileName(name.to_string())),
    }
}

impl ConfigFile {
    /// Create a profile, optionally seeded with the active profile's values.
    pub fn create_profile(
        &mut self,
        name: &str,
        copy_active: bool,
        activate: bool,
    ) -> Result<(), ConfigError> {
        validate_profile_name(name)?;
        if self.profiles.contains_key(name) {
            return Err(ConfigError::ProfileExists(name.to_string()));
        }
        let values = if copy_active {
            self.active_values().cloned().unwrap_or_default()
        } else {
            ProfileValues::new()
        };
        self.profiles.insert(name.to_string(), values);
        if activate {
            self.active_profile = name.to_string();
        }
        Ok(())
    }

    pub fn activate_profile(&mut self, name: &str) -> Result<(), ConfigError> {
        validate_profile_name(name)?;
        if !self.profiles.contains_key(name) {
            return Err(ConfigError::ProfileNotFound(name.to_string()));
        }
        self.active_profile = name.to_string();
        Ok(())
    }

    /// Returns true when the deleted profile was active and `default` took over.
    pub fn delete_profile(&mut self, name: &str) -> Result<bool, ConfigError> {
        validate_profile_name(name)?;
        if name == DEFAULT_PROFILE {
            return Err(ConfigError::CannotDeleteDefault);
        }
        if self.profiles.remove(name).is_none() {
            return Err(ConfigError::ProfileNotFound(name.to_string()));
        }
        let was_active = self.active_profile == name;
        if was_active {
            self.active_profile = DEFAULT_PROFILE.to_string();
            self.profiles.entry(DEFAULT_PROFILE.to_string()).or_default();
        }
        Ok(was_active)
    }

    /// Profile names in display order, paired with their active flag.
    pub fn list_profiles(&self) -> Vec<(String, bool)> {
        self.profiles
            .keys()
            .map(|name| (name.clone(), *name == self.active_profile))
            .collect()
    }

    /// Serialize one profile as a standalone TOML document.
    pub fn export_profile(&self, name: &str) -> Result<String, ConfigError> {
        let values = self
            .profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string()))?;
        toml::to_string_pretty(values).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Add a profile from a TOML document of setting values.
    pub fn import_profile(
        &mut self,
        name: &str,
        document: &str,
        activate: bool,
    ) -> Result<(), ConfigError> {
        validate_profile_name(name)?;
        if self.profiles.contains_key(name) {
            return Err(ConfigError::ProfileExists(name.to_string()));
        }
        let raw: toml::Table =
            toml::from_str(document).map_err(|e| ConfigError::InvalidImport(e.to_string()))?;

        let mut values = ProfileValues::new();
        for (key, value) in raw {
            let setting = keys::lookup(&key).ok_or_else(|| ConfigError::UnknownKey(key.clone()))?;
            let text = match value {
                toml::Value::String(s) => s,
                other => other.to_string(),
            };
            let canonical = setting
                .validate(&text)
                .map_err(|reason| ConfigError::InvalidValue {
                    key: key.clone(),
                    reason,
                })?;
            values.insert(key, canonical);
        }

        self.profiles.insert(name.to_string(), values);
        if activate {
            self.active_profile = name.to_string();
        }
        Ok(())
    }
}
