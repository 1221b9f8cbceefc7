//! Configuration for the uploader
//!
//! Settings come from, in order of precedence: the `JOBSTRONAUT_API_BASE`
//! environment variable (runtime, then compile time), an optional
//! `config.json` in the platform config directory under
//! "jobstronaut-uploader/", and finally built-in defaults.

use crate::validation::{FilePolicy, DEFAULT_MAX_FILE_SIZE};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR_NAME: &str = "jobstronaut-uploader";

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Environment variable overriding the backend base URL
pub const API_BASE_ENV: &str = "JOBSTRONAUT_API_BASE";

/// Production backend
pub const DEFAULT_API_BASE: &str = "https://jobstronaut-backend1.onrender.com";

/// Uploader settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploaderConfig {
    pub base_url: String,
    pub presign_timeout_secs: u64,
    /// Large files take a while, so this is the longest timeout
    pub transfer_timeout_secs: u64,
    pub notify_timeout_secs: u64,
    /// Waitlist and health calls
    pub request_timeout_secs: u64,
    pub max_file_size_bytes: u64,
    /// Accept DOC/DOCX/TXT/RTF/ODT as well as PDF
    pub permissive_types: bool,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            presign_timeout_secs: 20,
            transfer_timeout_secs: 60,
            notify_timeout_secs: 10,
            request_timeout_secs: 15,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE,
            permissive_types: false,
        }
    }
}

impl UploaderConfig {
    /// Load from the config file (if any) and apply the environment override.
    ///
    /// Local development: `JOBSTRONAUT_API_BASE=http://localhost:10000 jobstronaut-uploader ...`
    pub fn load() -> Result<Self, String> {
        let config: UploaderConfig = load_config_file(CONFIG_FILE_NAME)?.unwrap_or_default();
        Ok(config.with_env_override())
    }

    /// Apply the `JOBSTRONAUT_API_BASE` override (runtime or compile time), if set
    pub fn with_env_override(self) -> Self {
        self.with_base_url_override(base_url_override())
    }

    fn with_base_url_override(mut self, base_url: Option<String>) -> Self {
        if let Some(base_url) = base_url {
            self.base_url = base_url;
        }
        self.base_url = normalize_base_url(&self.base_url);
        self
    }

    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Self {
        self.base_url = normalize_base_url(base_url.as_ref());
        self
    }

    pub fn file_policy(&self) -> FilePolicy {
        let policy = if self.permissive_types {
            FilePolicy::permissive()
        } else {
            FilePolicy::pdf_only()
        };
        policy.with_max_size(self.max_file_size_bytes)
    }

    pub fn presign_timeout(&self) -> Duration {
        Duration::from_secs(self.presign_timeout_secs)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Base URL from the environment: runtime variable first, then the value baked in at compile time
pub fn base_url_override() -> Option<String> {
    env::var(API_BASE_ENV)
        .ok()
        .or_else(|| option_env!("JOBSTRONAUT_API_BASE").map(String::from))
        .filter(|url| !url.trim().is_empty())
}

/// Trim whitespace and trailing slashes so paths can be appended with `format!`
pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Get the app's config directory path.
///
/// Returns: `~/.config/jobstronaut-uploader` (Linux)
///          `~/Library/Application Support/jobstronaut-uploader` (macOS)
///          `C:\Users\<User>\AppData\Roaming\jobstronaut-uploader` (Windows)
pub fn get_config_dir() -> Result<PathBuf, String> {
    let config_dir = dirs::config_dir()
        .ok_or("Could not find config directory")?;
    Ok(config_dir.join(APP_DIR_NAME))
}

/// Get the directory where log files and diagnostic reports are written.
///
/// Returns: `~/.jobstronaut-uploader/logs`
pub fn get_logs_dir() -> Result<PathBuf, String> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| "Could not find home directory".to_string())?;
    Ok(home_dir.join(format!(".{}", APP_DIR_NAME)).join("logs"))
}

/// Get the full path to a config file.
pub fn config_file_path(filename: &str) -> Result<PathBuf, String> {
    Ok(get_config_dir()?.join(filename))
}

/// Ensure the config directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, String> {
    let dir = get_config_dir()?;
    fs::create_dir_all(&dir)
        .map_err(|e| format!("Failed to create config directory: {}", e))?;
    Ok(dir)
}

/// Save data to a config file as JSON.
///
/// # Returns
/// The path where the file was saved
pub fn save_config_file<T: Serialize>(filename: &str, data: &T) -> Result<PathBuf, String> {
    let config_file = ensure_config_dir()?.join(filename);
    write_json(&config_file, data)?;
    Ok(config_file)
}

/// Load data from a config file in the app's config directory.
///
/// # Returns
/// * `Ok(Some(data))` if file exists and was parsed successfully
/// * `Ok(None)` if file doesn't exist
/// * `Err(...)` if file exists but couldn't be read/parsed
pub fn load_config_file<T: DeserializeOwned>(filename: &str) -> Result<Option<T>, String> {
    read_json(&config_file_path(filename)?)
}

/// Write `data` as pretty JSON to an explicit path
pub fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    fs::write(path, json)
        .map_err(|e| format!("Failed to write config file: {}", e))
}

/// Read JSON from an explicit path; a missing file is `Ok(None)`
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, String> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file: {}", e))?;

    let data = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse config file: {}", e))?;

    Ok(Some(data))
}
