//! Per-profile credential persistence.
//!
//! The OS keyring is preferred. Whenever it is unavailable the bundle is written
//! to `cli-auth-storage.txt` in the profile folder as base64-encoded JSON with
//! owner-only permissions.

use super::credentials::Credentials;
use super::error::{AuthError, AuthResult};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const KEYRING_SERVICE: &str = "stackit-cli";
pub const KEYRING_USER: &str = "auth";
pub const TEXT_FILE_NAME: &str = "cli-auth-storage.txt";
pub const DEFAULT_PROFILE: &str = "default";

/// Where a serialized bundle is kept.
pub trait SecretBackend: Send + Sync {
    fn name(&self) -> &'static str;
    fn load(&self) -> AuthResult<Option<String>>;
    fn store(&self, secret: &str) -> AuthResult<()>;
    fn delete(&self) -> AuthResult<()>;
}

pub struct KeyringBackend {
    service: String,
}

impl KeyringBackend {
    pub fn for_profile(profile: &str) -> Self {
        let service = if profile == DEFAULT_PROFILE {
            KEYRING_SERVICE.to_string()
        } else {
            format!("{KEYRING_SERVICE}/{profile}")
        };
        Self { service }
    }

    fn entry(&self) -> AuthResult<keyring::Entry> {
        keyring::Entry::new(&self.service, KEYRING_USER)
            .map_err(|e| AuthError::storage(format!("open keyring entry: {e}")))
    }
}

impl SecretBackend for KeyringBackend {
    fn name(&self) -> &'static str {
        "keyring"
    }

    fn load(&self) -> AuthResult<Option<String>> {
        match self.entry()?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(AuthError::storage(format!("read keyring: {e}"))),
        }
    }

    fn store(&self, secret: &str) -> AuthResult<()> {
        self.entry()?
            .set_password(secret)
            .map_err(|e| AuthError::storage(format!("write keyring: {e}")))
    }

    fn delete(&self) -> AuthResult<()> {
        match self.entry()?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(AuthError::storage(format!("delete keyring entry: {e}"))),
        }
    }
}

pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    /// `<config_dir>/cli-auth-storage.txt` for the default profile,
    /// `<config_dir>/profiles/<name>/cli-auth-storage.txt` otherwise.
    pub fn for_profile(config_dir: &Path, profile: &str) -> Self {
        let folder = if profile == DEFAULT_PROFILE {
            config_dir.to_path_buf()
        } else {
            config_dir.join("profiles").join(profile)
        };
        Self {
            path: folder.join(TEXT_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SecretBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    fn load(&self) -> AuthResult<Option<String>> {
        let encoded = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AuthError::storage(format!(
                    "read {}: {e}",
                    self.path.display()
                )));
            }
        };
        if encoded.trim().is_empty() {
            return Ok(None);
        }
        let decoded = STANDARD.decode(encoded.trim()).map_err(|e| {
            AuthError::storage(format!("decode {}: {e}", self.path.display()))
        })?;
        String::from_utf8(decoded)
            .map(Some)
            .map_err(|e| AuthError::storage(format!("decode {}: {e}", self.path.display())))
    }

    fn store(&self, secret: &str) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AuthError::storage(format!("create {}: {e}", parent.display()))
            })?;
        }

        // Write to a temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("txt.tmp");
        write_private(&temp_path, STANDARD.encode(secret).as_bytes())
            .map_err(|e| AuthError::storage(format!("write {}: {e}", temp_path.display())))?;
        std::fs::rename(&temp_path, &self.path)
            .map_err(|e| AuthError::storage(format!("write {}: {e}", self.path.display())))
    }

    fn delete(&self) -> AuthResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::storage(format!(
                "delete {}: {e}",
                self.path.display()
            ))),
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

/// Credential store for one profile: keyring first, text file as fallback.
pub struct CredentialStore {
    profile: String,
    primary: Option<Box<dyn SecretBackend>>,
    fallback: FileBackend,
}

impl CredentialStore {
    pub fn new(config_dir: &Path, profile: &str) -> Self {
        Self {
            profile: profile.to_string(),
            primary: Some(Box::new(KeyringBackend::for_profile(profile))),
            fallback: FileBackend::for_profile(config_dir, profile),
        }
    }

    /// Store that never touches the OS keyring.
    pub fn file_only(config_dir: &Path, profile: &str) -> Self {
        Self {
            profile: profile.to_string(),
            primary: None,
            fallback: FileBackend::for_profile(config_dir, profile),
        }
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn load(&self) -> AuthResult<Option<Credentials>> {
        let mut raw = None;
        if let Some(primary) = &self.primary {
            match primary.load() {
                Ok(found) => raw = found,
                Err(e) => debug!("{} unavailable, falling back to file: {}", primary.name(), e),
            }
        }
        if raw.is_none() {
            raw = self.fallback.load()?;
        }

        raw.map(|json| {
            serde_json::from_str(&json)
                .map_err(|e| AuthError::storage(format!("parse stored credentials: {e}")))
        })
        .transpose()
    }

    pub fn save(&self, credentials: &Credentials) -> AuthResult<()> {
        let json = serde_json::to_string(credentials)
            .map_err(|e| AuthError::storage(format!("serialize credentials: {e}")))?;

        if let Some(primary) = &self.primary {
            match primary.store(&json) {
                Ok(()) => {
                    debug!("stored {} credentials in {}", credentials.flow_name(), primary.name());
                    return Ok(());
                }
                Err(e) => debug!("{} unavailable, falling back to file: {}", primary.name(), e),
            }
        }
        self.fallback.store(&json)
    }

    /// Wipe the bundle from every backend.
    pub fn clear(&self) -> AuthResult<()> {
        if let Some(primary) = &self.primary
            && let Err(e) = primary.delete()
        {
            debug!("{} delete failed: {}", primary.name(), e);
        }
        self.fallback.delete()
    }
}
