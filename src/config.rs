//! Configuration management for lovenote
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{LovenoteError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Main configuration structure for lovenote
///
/// Holds everything needed to reach the API server and to keep the
/// session alive between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// API server settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Session persistence settings
    #[serde(default)]
    pub session: SessionConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Root of the REST API; endpoint paths are resolved against it
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// Upper bound on a token refresh call, in seconds. `0` disables the
    /// bound.
    #[serde(default = "default_refresh_timeout_seconds")]
    pub refresh_timeout_seconds: u64,

    /// `User-Agent` header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Endpoint paths, relative to `base_url`
    #[serde(default)]
    pub endpoints: EndpointsConfig,
}

fn default_base_url() -> String {
    "http://localhost:8080/api/".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_refresh_timeout_seconds() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("lovenote/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_seconds: default_request_timeout_seconds(),
            refresh_timeout_seconds: default_refresh_timeout_seconds(),
            user_agent: default_user_agent(),
            endpoints: EndpointsConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Parsed `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`LovenoteError::Url`] if the URL does not parse.
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url).map_err(|e| LovenoteError::Url(e).into())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn refresh_timeout(&self) -> Option<Duration> {
        match self.refresh_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Paths of the user endpoints the session layer calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_login_path")]
    pub login: String,
    #[serde(default = "default_register_path")]
    pub register: String,
    /// Exchanges the durable cookie for a new access token
    #[serde(default = "default_refresh_path")]
    pub refresh: String,
    /// Returns the user the bearer token belongs to
    #[serde(default = "default_me_path")]
    pub me: String,
    #[serde(default = "default_logout_path")]
    pub logout: String,
}

fn default_login_path() -> String {
    "users/login".to_string()
}

fn default_register_path() -> String {
    "users".to_string()
}

fn default_refresh_path() -> String {
    "users/refresh".to_string()
}

fn default_me_path() -> String {
    "users/me".to_string()
}

fn default_logout_path() -> String {
    "users/logout".to_string()
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            login: default_login_path(),
            register: default_register_path(),
            refresh: default_refresh_path(),
            me: default_me_path(),
            logout: default_logout_path(),
        }
    }
}

/// Session persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Where the durable credential is saved between runs. Defaults to
    /// `<config dir>/lovenote/session.cookies`.
    #[serde(default)]
    pub cookie_jar_path: Option<PathBuf>,

    /// Whether to save the durable credential at all
    #[serde(default = "default_persist_cookies")]
    pub persist_cookies: bool,
}

fn default_persist_cookies() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_jar_path: None,
            persist_cookies: default_persist_cookies(),
        }
    }
}

impl SessionConfig {
    /// Effective cookie jar location.
    pub fn jar_path(&self) -> PathBuf {
        self.cookie_jar_path
            .clone()
            .unwrap_or_else(crate::http::cookie_jar::default_jar_path)
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| LovenoteError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| LovenoteError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("LOVENOTE_API_BASE_URL") {
            tracing::debug!(base_url = %base_url, "Env override: LOVENOTE_API_BASE_URL");
            self.api.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("LOVENOTE_REQUEST_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.request_timeout_seconds = value;
            } else {
                tracing::warn!("Invalid LOVENOTE_REQUEST_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(timeout) = std::env::var("LOVENOTE_REFRESH_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.refresh_timeout_seconds = value;
            } else {
                tracing::warn!("Invalid LOVENOTE_REFRESH_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(path) = std::env::var("LOVENOTE_COOKIE_JAR") {
            tracing::debug!(path = %path, "Env override: LOVENOTE_COOKIE_JAR");
            self.session.cookie_jar_path = Some(PathBuf::from(path));
        }

        if let Ok(persist) = std::env::var("LOVENOTE_PERSIST_COOKIES") {
            match persist.to_lowercase().parse::<bool>() {
                Ok(v) => self.session.persist_cookies = v,
                Err(_) => {
                    tracing::warn!("Invalid value for LOVENOTE_PERSIST_COOKIES: {}", persist)
                }
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(base_url) = &cli.base_url {
            tracing::debug!(base_url = %base_url, "CLI override: --base-url");
            self.api.base_url = base_url.clone();
        }
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
    }

    /// Validate the configuration
    ///
    /// Ensures the base URL is usable and that timeouts and endpoint paths
    /// are set.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.api.base_url).map_err(|e| {
            LovenoteError::Config(format!("Invalid api.base_url {}: {}", self.api.base_url, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(LovenoteError::Config(format!(
                "api.base_url must use http or https, got {}",
                url.scheme()
            ))
            .into());
        }

        if self.api.request_timeout_seconds == 0 {
            return Err(LovenoteError::Config(
                "api.request_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        let endpoints = &self.api.endpoints;
        for (name, path) in [
            ("login", &endpoints.login),
            ("register", &endpoints.register),
            ("refresh", &endpoints.refresh),
            ("me", &endpoints.me),
            ("logout", &endpoints.logout),
        ] {
            if crate::http::normalize_path(path).is_empty() {
                return Err(LovenoteError::Config(format!(
                    "api.endpoints.{} cannot be empty",
                    name
                ))
                .into());
            }
        }

        Ok(())
    }
}
