//! Backend endpoint and credential configuration.
//!
//! Resolution order: `HOMELAB_URL` / `HOMELAB_TOKEN` environment variables,
//! then `~/.config/homelab-hub/config.json`, then defaults
//! (`http://localhost:8000`, no token).

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Backend URL used when nothing else is configured.
pub const DEFAULT_URL: &str = "http://localhost:8000";

/// Environment variable overriding the backend URL.
pub const URL_ENV: &str = "HOMELAB_URL";

/// Environment variable overriding the bearer token.
pub const TOKEN_ENV: &str = "HOMELAB_TOKEN";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Path of the persisted config file.
pub fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("homelab-hub")
        .join("config.json")
}

/// Contents of `config.json`. Unknown keys are preserved on save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FileConfig {
    /// Read the config file. A missing file is `Ok(None)`.
    pub fn read(path: &Path) -> Result<Option<Self>, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Like [`FileConfig::read`], but an unusable file only logs a warning.
    pub fn read_or_default(path: &Path) -> Self {
        match Self::read(path) {
            Ok(config) => config.unwrap_or_default(),
            Err(e) => {
                log::warn!("Ignoring config file: {}", e);
                Self::default()
            }
        }
    }

    /// Overlay the values set in `update` onto `self`.
    pub fn merge(&mut self, update: FileConfig) {
        if update.url.is_some() {
            self.url = update.url;
        }
        if update.token.is_some() {
            self.token = update.token;
        }
        self.extra.extend(update.extra);
    }

    /// Write the file, creating parent directories. The file may hold a
    /// bearer token, so on unix it is restricted to the owner.
    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(io_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .map_err(io_err)?;
        }
        Ok(())
    }
}

/// Merge `update` into the config file at `path` and return the saved result.
pub fn save_config(path: &Path, update: FileConfig) -> Result<FileConfig, ConfigError> {
    let mut config = FileConfig::read(path)?.unwrap_or_default();
    config.merge(update);
    config.write(path)?;
    log::info!("Saved config to {}", path.display());
    Ok(config)
}

/// Resolved backend endpoint and credential. Read-only once built.
#[derive(Clone, PartialEq, Eq)]
pub struct HomelabConfig {
    url: String,
    token: Option<String>,
}

impl HomelabConfig {
    /// Build a config; a trailing `/` on the URL is dropped and an empty
    /// token means no token.
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        let url = url.into();
        Self {
            url: url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    /// Resolve from the process environment and the default config file.
    pub fn load() -> Self {
        Self::resolve(
            std::env::var(URL_ENV).ok(),
            std::env::var(TOKEN_ENV).ok(),
            FileConfig::read_or_default(&config_path()),
        )
    }

    /// Apply the priority order to already-gathered sources. Empty strings
    /// count as unset.
    pub fn resolve(env_url: Option<String>, env_token: Option<String>, file: FileConfig) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        let url = non_empty(env_url)
            .or_else(|| non_empty(file.url))
            .unwrap_or_else(|| DEFAULT_URL.to_string());
        let token = non_empty(env_token).or_else(|| non_empty(file.token));
        Self::new(url, token)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

impl fmt::Debug for HomelabConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HomelabConfig")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
