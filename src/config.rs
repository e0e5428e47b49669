//! Library configuration.
//!
//! Holds the backend base URL and the location of the persisted token file.
//! The token file defaults to `~/.config/sessiongate/tokens.json`.

use std::path::PathBuf;

use anyhow::Result;

/// Application name used for the config directory path
const APP_NAME: &str = "sessiongate";

/// Token file name
const TOKEN_FILE: &str = "tokens.json";

/// Environment variable overriding the backend base URL
const BASE_URL_ENV: &str = "SESSIONGATE_API_URL";

/// Default backend base URL for local development
const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the token-issuing backend, without a trailing slash.
    pub base_url: String,
    /// File the access/refresh pair is persisted to.
    pub token_path: PathBuf,
}

impl Config {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            base_url,
            token_path: Self::default_token_path()?,
        })
    }

    /// Read the base URL from `SESSIONGATE_API_URL`, falling back to the
    /// local development default.
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    /// Override where the token file lives (tests point this at a temp dir).
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    fn default_token_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(TOKEN_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = Config::new("https://api.example.com/").expect("config");
        assert_eq!(config.base_url, "https://api.example.com");
    }

    #[test]
    fn test_token_path_override() {
        let config = Config::new("http://localhost:8000")
            .expect("config")
            .with_token_path("/tmp/sessiongate-test/tokens.json");
        assert_eq!(
            config.token_path,
            PathBuf::from("/tmp/sessiongate-test/tokens.json")
        );
    }

    #[test]
    fn test_default_token_path_names_token_file() {
        let config = Config::new("http://localhost:8000").expect("config");
        assert!(config.token_path.ends_with("sessiongate/tokens.json"));
    }
}
