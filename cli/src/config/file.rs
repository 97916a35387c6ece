//! Configuration file structure and persistence.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::ConfigError;
use stackit_shared::auth::DEFAULT_PROFILE;

pub const CONFIG_DIR_ENV: &str = "STACKIT_CONFIG_DIR";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const LOCK_FILE_NAME: &str = "config.lock";
const CONFIG_FOLDER: &str = "stackit";

/// Setting values of one profile, keyed by setting name.
pub type ProfileValues = BTreeMap<String, String>;

/// The complete configuration document.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ConfigFile {
    pub active_profile: String,
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileValues>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        ConfigFile {
            active_profile: DEFAULT_PROFILE.to_string(),
            profiles: BTreeMap::from([(DEFAULT_PROFILE.to_string(), ProfileValues::new())]),
        }
    }
}

impl ConfigFile {
    /// Parse a document and repair the profile invariants.
    pub fn parse(body: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut file: ConfigFile = toml::from_str(body).map_err(|e| ConfigError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        file.profiles.entry(DEFAULT_PROFILE.to_string()).or_default();
        file.profiles.entry(file.active_profile.clone()).or_default();
        Ok(file)
    }

    pub fn active_values(&self) -> Option<&ProfileValues> {
        self.profiles.get(&self.active_profile)
    }

    pub(crate) fn active_values_mut(&mut self) -> &mut ProfileValues {
        self.profiles.entry(self.active_profile.clone()).or_default()
    }
}

/// Location of the config document, its lock and the per-profile folders.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `$STACKIT_CONFIG_DIR`, else `<config_dir>/stackit`.
    pub fn locate(config_dir_override: Option<&str>) -> Result<Self, ConfigError> {
        if let Some(dir) = config_dir_override.filter(|d| !d.is_empty()) {
            return Ok(Self::new(dir));
        }
        let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::new(base.join(CONFIG_FOLDER)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE_NAME)
    }

    /// Missing file reads as the default document.
    pub fn load(&self) -> Result<ConfigFile, ConfigError> {
        let path = self.path();
        match std::fs::read_to_string(&path) {
            Ok(body) => ConfigFile::parse(&body, &path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no config file at {}, using defaults", path.display());
                Ok(ConfigFile::default())
            }
            Err(e) => Err(ConfigError::Read { path, source: e }),
        }
    }

    /// Load, mutate and save under the advisory lock.
    pub fn update<T>(
        &self,
        mutate: impl FnOnce(&mut ConfigFile) -> Result<T, ConfigError>,
    ) -> Result<T, ConfigError> {
        let _lock = self.lock()?;
        let mut file = self.load()?;
        let result = mutate(&mut file)?;
        self.save(&file)?;
        Ok(result)
    }

    /// Write temp file, fsync, rename. Callers hold the lock.
    fn save(&self, file: &ConfigFile) -> Result<(), ConfigError> {
        let path = self.path();
        let write_err = |source| ConfigError::Write {
            path: path.clone(),
            source,
        };
        let body = toml::to_string_pretty(file).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::create_dir_all(&self.dir).map_err(write_err)?;
        let temp_path = self.dir.join(format!(".{CONFIG_FILE_NAME}.{}.tmp", std::process::id()));
        let written = (|| {
            let mut temp = File::create(&temp_path)?;
            temp.write_all(body.as_bytes())?;
            temp.sync_all()?;
            std::fs::rename(&temp_path, &path)
        })();
        if let Err(e) = written {
            let _ = std::fs::remove_file(&temp_path);
            return Err(write_err(e));
        }
        debug!("saved config to {}", path.display());
        Ok(())
    }

    fn lock(&self) -> Result<ConfigLock, ConfigError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| ConfigError::Write {
            path: self.dir.clone(),
            source,
        })?;
        ConfigLock::acquire(&self.dir.join(LOCK_FILE_NAME))
    }
}

/// Exclusive `flock` held until drop.
struct ConfigLock {
    #[cfg_attr(not(unix), allow(dead_code))]
    file: File,
}

impl ConfigLock {
    fn acquire(path: &Path) -> Result<Self, ConfigError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;

        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            // SAFETY: the descriptor is owned by `file` and stays open for the call.
            let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
            if rc != 0 {
                return Err(ConfigError::Write {
                    path: path.to_path_buf(),
                    source: std::io::Error::last_os_error(),
                });
            }
        }
        Ok(Self { file })
    }
}

impl Drop for ConfigLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            // SAFETY: see `acquire`.
            unsafe {
                libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
            }
        }
    }
}
