//! Configuration management for orgpulse
//!
//! Stores settings in ~/.config/orgpulse/config.json. The API token is kept
//! in the system keychain, never in this file.

use crate::keyring;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR: &str = "orgpulse";
const CONFIG_FILE: &str = "config.json";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MIN_TIMEOUT_SECS: u64 = 1;
const MAX_TIMEOUT_SECS: u64 = 600;

pub const ENV_API_URL: &str = "ORGPULSE_API_URL";
pub const ENV_API_TOKEN: &str = "ORGPULSE_API_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "ORGPULSE_TIMEOUT_SECS";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend base URL, e.g. https://api.example.com/v1
    pub api_url: Option<String>,
    /// Per-request timeout applied by the HTTP client
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Loaded tab data older than this is refetched when the tab is shown again
    #[serde(default)]
    pub tab_max_age_secs: Option<u64>,
    /// Write logs to the data directory while the TUI runs
    #[serde(default = "default_true")]
    pub log_to_file: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            tab_max_age_secs: None,
            log_to_file: true,
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(CONFIG_DIR))
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join(CONFIG_FILE))
    }

    /// Load config from disk, or return default
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from an explicit path. A corrupt file is set aside and defaults
    /// are used instead.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(err) => {
                preserve_corrupt_config(path, &content);
                tracing::warn!("config file {} was corrupted: {}", path.display(), err);
                eprintln!(
                    "  Warning: Config file was corrupted ({}). A backup was saved and defaults were loaded.",
                    err
                );
                Self::default()
            }
        }
    }

    /// Save config to disk
    pub fn save(&self) -> Result<(), String> {
        let dir = Self::config_dir()
            .ok_or_else(|| "Could not determine config directory".to_string())?;
        self.save_to(&dir.join(CONFIG_FILE))
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Err(e) = fs::set_permissions(dir, fs::Permissions::from_mode(0o700)) {
                    tracing::warn!("failed to set config directory permissions: {}", e);
                }
            }
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;
        crate::util::write_atomic(path, &content)
            .map_err(|e| format!("Failed to write config: {}", e))
    }

    /// Backend URL: environment first, then the config file.
    pub fn api_base_url(&self) -> Option<String> {
        std::env::var(ENV_API_URL)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.api_url.clone())
    }

    /// API token: environment first, then the keychain.
    pub fn api_token(&self) -> Option<String> {
        if let Ok(token) = std::env::var(ENV_API_TOKEN) {
            if !token.trim().is_empty() {
                return Some(token.trim().to_string());
            }
        }
        match keyring::get_api_token() {
            Ok(token) => token,
            Err(err) => {
                keyring::warn_keychain_error_once("API token", &err);
                None
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        let secs = std::env::var(ENV_TIMEOUT_SECS)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(self.request_timeout_secs);
        Duration::from_secs(secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS))
    }

    pub fn tab_max_age(&self) -> Option<chrono::Duration> {
        self.tab_max_age_secs
            .filter(|secs| *secs > 0)
            .and_then(|secs| chrono::Duration::try_seconds(secs as i64))
    }

    /// Get the config file location for display
    pub fn config_location() -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "~/.config/orgpulse/config.json".to_string())
    }
}

/// Interactive prompt to store the API URL and token
pub fn setup_interactive() -> Result<(), String> {
    use std::io::{self, Write};

    let mut config = Config::load();

    println!();
    println!("  ┌─────────────────────────────────────────────────────────┐");
    println!("  │  ORGPULSE SETUP                                         │");
    println!("  └─────────────────────────────────────────────────────────┘");
    println!();
    if let Some(current) = config.api_url.as_deref() {
        println!("  Current API URL: {}", current);
    }
    print!("  API URL (blank to keep): ");
    io::stdout().flush().map_err(|e| e.to_string())?;
    let mut url = String::new();
    io::stdin().read_line(&mut url).map_err(|e| e.to_string())?;
    let url = url.trim();
    if !url.is_empty() {
        url::Url::parse(url).map_err(|e| format!("Invalid API URL: {}", e))?;
        config.api_url = Some(url.to_string());
    }

    print!("  API token: ");
    io::stdout().flush().map_err(|e| e.to_string())?;
    let mut token = String::new();
    io::stdin().read_line(&mut token).map_err(|e| e.to_string())?;
    let token = token.trim();
    if token.is_empty() {
        return Err("No API token provided".to_string());
    }

    keyring::set_api_token(token).map_err(|e| {
        format!(
            "Failed to store API token in system keychain: {}. \
             You can set the {} environment variable instead.",
            e, ENV_API_TOKEN
        )
    })?;
    config.save()?;

    println!();
    println!("  + Settings saved to {}", Config::config_location());
    println!();
    Ok(())
}

fn preserve_corrupt_config(path: &Path, content: &str) {
    let corrupt_path = path.with_extension("json.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.api_url.is_none());
        assert_eq!(config.request_timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(config.log_to_file);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: Config = serde_json::from_str(r#"{"api_url": "http://localhost:8000"}"#).unwrap();
        assert_eq!(config.api_url.as_deref(), Some("http://localhost:8000"));
        assert_eq!(config.request_timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(config.tab_max_age().is_none());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let config = Config {
            api_url: Some("https://api.example.com".to_string()),
            tab_max_age_secs: Some(120),
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded.api_url, config.api_url);
        assert_eq!(loaded.tab_max_age(), chrono::Duration::try_seconds(120));
    }

    #[test]
    fn test_corrupt_config_is_preserved() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{not json").unwrap();

        let loaded = Config::load_from(&path);
        assert!(loaded.api_url.is_none());
        assert!(path.with_extension("json.corrupt").exists());
        assert!(!path.exists());
    }

    #[test]
    fn test_timeout_is_clamped() {
        let config = Config {
            request_timeout_secs: 0,
            ..Config::default()
        };
        if std::env::var(ENV_TIMEOUT_SECS).is_err() {
            assert_eq!(config.request_timeout(), Duration::from_secs(MIN_TIMEOUT_SECS));
        }
    }
}
