//! Per-user blob cache for short-lived derived artifacts.
//!
//! Entries live as individual files named after their identifier. Identifiers are
//! validated against `^[a-zA-Z0-9-]+$` before any filesystem access, so callers with
//! arbitrary keys must hash them into that alphabet first.

use regex::Regex;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

const CACHE_DIR_NAME: &str = "stackit";

static IDENTIFIER_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new("^[a-zA-Z0-9-]+$"));

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("invalid cache identifier {0:?}")]
    InvalidCacheIdentifier(String),

    #[error("cache entry {0:?} not found")]
    NotFound(String),

    #[error("cache directory could not be determined")]
    NoCacheDir,

    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CacheError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub fn validate_identifier(id: &str) -> Result<(), CacheError> {
    match IDENTIFIER_PATTERN.as_ref() {
        Ok(pattern) if pattern.is_match(id) => Ok(()),
        _ => Err(CacheError::InvalidCacheIdentifier(id.to_string())),
    }
}

/// File-backed cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct Cache {
    dir: PathBuf,
}

impl Cache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache under the platform cache directory (`~/.cache/stackit` on Linux).
    pub fn from_default_dir() -> Result<Self, CacheError> {
        let base = dirs::cache_dir().ok_or(CacheError::NoCacheDir)?;
        Ok(Self::new(base.join(CACHE_DIR_NAME)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn get(&self, id: &str) -> Result<Vec<u8>, CacheError> {
        validate_identifier(id)?;
        let path = self.dir.join(id);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CacheError::NotFound(id.to_string()))
            }
            Err(e) => Err(CacheError::io(&path, e)),
        }
    }

    /// Write an entry atomically with owner-only permissions.
    pub fn put(&self, id: &str, data: &[u8]) -> Result<(), CacheError> {
        validate_identifier(id)?;
        std::fs::create_dir_all(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;

        let path = self.dir.join(id);
        let temp_path = self.dir.join(format!(".{id}.tmp"));
        write_private(&temp_path, data).map_err(|e| CacheError::io(&temp_path, e))?;
        std::fs::rename(&temp_path, &path).map_err(|e| CacheError::io(&path, e))?;

        debug!("wrote cache entry {}", id);
        Ok(())
    }

    /// Remove an entry. Missing entries are not an error.
    pub fn delete(&self, id: &str) -> Result<(), CacheError> {
        validate_identifier(id)?;
        let path = self.dir.join(id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io(&path, e)),
        }
    }
}

fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.sync_all()
}
