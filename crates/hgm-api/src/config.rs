use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ApiError, Result};
use crate::search::DEFAULT_DEBOUNCE;

pub const DEFAULT_API_URL: &str = "http://165.22.208.62:5000";

/// Settings read from `<home>/config.toml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub search_debounce_ms: u64,
    /// Infer roles from username patterns (CGAB..., CGPV...) when the server
    /// omits them. Deprecated; kept for older accounts.
    pub legacy_role_inference: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: 30,
            probe_timeout_secs: 10,
            search_debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            legacy_role_inference: true,
        }
    }
}

impl Config {
    /// Load from the default home, applying the `HGM_API_URL` override.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&default_home_dir()?)?;
        if let Ok(url) = std::env::var("HGM_API_URL") {
            config.api_url = url;
        }
        Ok(config)
    }

    pub fn load_from(home: &Path) -> Result<Self> {
        let path = home.join("config.toml");
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(&path)?;
        toml::from_str(&contents)
            .map_err(|e| ApiError::InvalidInput(format!("Invalid {}: {e}", path.display())))
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
        }
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

/// What the HTTP client needs to know.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub probe_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Config::default().client_config()
        }
    }
}

/// `$HGM_HOME`, or `~/.hgm`.
pub fn default_home_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("HGM_HOME") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir()
        .ok_or_else(|| ApiError::Storage("Failed to get home directory".into()))?;
    Ok(home.join(".hgm"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.search_debounce(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.toml"),
            "api_url = \"http://localhost:5000/\"\nlegacy_role_inference = false\n",
        )
        .unwrap();

        let config = Config::load_from(dir.path()).unwrap();
        assert!(!config.legacy_role_inference);
        assert_eq!(config.probe_timeout_secs, 10);
        assert_eq!(config.client_config().base_url, "http://localhost:5000");
    }

    #[test]
    fn test_malformed_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.toml"), "api_url = [").unwrap();
        assert!(matches!(
            Config::load_from(dir.path()),
            Err(ApiError::InvalidInput(_))
        ));
    }
}
