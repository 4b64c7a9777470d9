//! Client configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::Error;

fn default_refresh_path() -> String {
    "/api/refresh".to_string()
}

fn default_token_field() -> String {
    "access_token".to_string()
}

fn default_user_agent() -> String {
    concat!("authrelay/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// The refresh wire contract differs across observed backend variants (both the
/// endpoint path and the token field name), so both are configuration rather
/// than constants.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub base_url: String,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    #[serde(default = "default_token_field")]
    pub token_field: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Config {
    pub fn new(base_url: impl Into<String>) -> Result<Self, Error> {
        Self {
            base_url: base_url.into(),
            refresh_path: default_refresh_path(),
            token_field: default_token_field(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
        .validated()
    }

    /// # ENV Vars
    /// * `AUTHRELAY_BASE_URL` - backend base URL (required)
    /// * `AUTHRELAY_REFRESH_PATH` - refresh endpoint path
    /// * `AUTHRELAY_TOKEN_FIELD` - token field name in login/refresh responses
    /// * `AUTHRELAY_TIMEOUT_SECS` - per-request timeout
    pub fn from_env() -> Result<Self, Error> {
        let base_url = std::env::var("AUTHRELAY_BASE_URL")
            .map_err(|_| Error::Config("Missing AUTHRELAY_BASE_URL env var".to_string()))?;
        let mut config = Self::new(base_url)?;
        if let Ok(path) = std::env::var("AUTHRELAY_REFRESH_PATH") {
            config.refresh_path = path;
        }
        if let Ok(field) = std::env::var("AUTHRELAY_TOKEN_FIELD") {
            config.token_field = field;
        }
        if let Ok(secs) = std::env::var("AUTHRELAY_TIMEOUT_SECS") {
            config.timeout_secs = secs.parse().map_err(|_| {
                Error::Config(format!("Invalid AUTHRELAY_TIMEOUT_SECS '{secs}'"))
            })?;
        }
        config.validated()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validated()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the base URL before any network call and normalize it so path
    /// concatenation is unambiguous.
    fn validated(mut self) -> Result<Self, Error> {
        let _ = reqwest::Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", self.base_url, e)))?;
        while self.base_url.ends_with('/') {
            self.base_url.pop();
        }
        if !self.refresh_path.starts_with('/') {
            return Err(Error::Config(format!(
                "Refresh path '{}' must start with '/'",
                self.refresh_path
            )));
        }
        if self.token_field.is_empty() {
            return Err(Error::Config("Token field name must not be empty".into()));
        }
        Ok(self)
    }
}
