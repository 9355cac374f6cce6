//! Configuration loading for sheetdash
//!
//! Settings come from an optional JSON file, overridden by environment
//! variables and command-line flags. The result is a validated [`Settings`]
//! value the rest of the application consumes.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::DEFAULT_TTL;
use crate::data::Credentials;

/// File name of the config inside the platform config directory
const CONFIG_FILE_NAME: &str = "config.json";

/// Errors that can occur while resolving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`FileConfig`]
    #[error("Invalid config file {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No sheet link was supplied anywhere
    #[error("No sheet URL configured. Pass --sheet-url, set SHEETDASH_SHEET_URL, or add \"sheet_url\" to the config file")]
    MissingSheetUrl,

    /// A zero TTL would refetch on every render
    #[error("TTL must be at least one second")]
    ZeroTtl,
}

/// Contents of the JSON config file
///
/// ```json
/// {
///   "sheet_url": "https://docs.google.com/spreadsheets/d/<id>/edit",
///   "worksheet": "Daily 2026",
///   "ttl_secs": 3600,
///   "credentials": { "access_token": "...", "api_key": "..." }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub sheet_url: Option<String>,
    pub worksheet: Option<String>,
    pub ttl_secs: Option<u64>,
    pub credentials: Credentials,
}

impl FileConfig {
    /// Reads and parses a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads the config from the platform config directory
    ///
    /// A missing file is not an error and yields an empty config.
    pub fn load_default() -> Result<Self, ConfigError> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// Path of the config file in the platform config directory
///
/// Uses `~/.config/sheetdash/config.json` on Linux. Returns `None` when no
/// home directory can be determined.
pub fn default_config_path() -> Option<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "sheetdash")?;
    Some(project_dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub sheet_url: Option<String>,
    pub worksheet: Option<String>,
    pub ttl_secs: Option<u64>,
    pub access_token: Option<String>,
    pub api_key: Option<String>,
}

/// Fully resolved settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub sheet_url: String,
    pub worksheet: Option<String>,
    pub ttl: Duration,
    pub credentials: Credentials,
}

impl Settings {
    /// Layers overrides on top of the file config and validates the result
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self, ConfigError> {
        let sheet_url = overrides
            .sheet_url
            .or(file.sheet_url)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::MissingSheetUrl)?;

        let ttl = match overrides.ttl_secs.or(file.ttl_secs) {
            Some(0) => return Err(ConfigError::ZeroTtl),
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_TTL,
        };

        let credentials = Credentials {
            access_token: overrides.access_token.or(file.credentials.access_token),
            api_key: overrides.api_key.or(file.credentials.api_key),
        };

        Ok(Self {
            sheet_url,
            worksheet: overrides.worksheet.or(file.worksheet),
            ttl,
            credentials,
        })
    }
}
