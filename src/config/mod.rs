//! Client configuration
//!
//! Values are resolved in this order, later sources winning:
//! - built-in defaults
//! - an optional TOML file
//! - `WAGERLINE_*` environment variables
//! - explicit builder calls (CLI flags)

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default authority endpoint used for local development
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Fixed file name under which the credential pair is persisted
pub const CREDENTIALS_FILE_NAME: &str = "credentials.json";

/// Environment variable overriding the authority base URL
pub const API_URL_ENV: &str = "WAGERLINE_API_URL";

/// Environment variable overriding the credential file location
pub const CREDENTIALS_ENV: &str = "WAGERLINE_CREDENTIALS";

/// Environment variable overriding the request timeout, in seconds
pub const TIMEOUT_ENV: &str = "WAGERLINE_TIMEOUT_SECS";

/// Resolved client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every endpoint path is appended to
    pub base_url: String,
    /// Per-request timeout enforced by the HTTP layer
    pub request_timeout: Duration,
    /// User agent string for HTTP requests
    pub user_agent: String,
    /// Where the credential pair is persisted; `None` keeps it in memory only
    pub credentials_path: Option<PathBuf>,
}

/// On-disk representation of the optional config file
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub api_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub credentials_path: Option<PathBuf>,
    pub user_agent: Option<String>,
}

impl ConfigFile {
    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;
        Ok(toml::from_str(&contents)?)
    }
}

impl ClientConfig {
    /// Create a new configuration builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Start from an optional config file with environment overrides applied on top
    pub fn load(config_file: Option<&Path>) -> Result<ClientConfigBuilder> {
        let file = match config_file {
            Some(path) => ConfigFile::load_from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => ConfigFile::load_from_file(&path)?,
                _ => ConfigFile::default(),
            },
        };

        let mut builder = ClientConfigBuilder::from_file(file);
        builder.override_from_env()?;
        Ok(builder)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Unsupported URL scheme: {}",
                url.scheme()
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Full URL for an endpoint path such as `/profile/`
    pub fn endpoint_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Default location of the persisted credential pair
pub fn default_credentials_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("wagerline").join(CREDENTIALS_FILE_NAME))
}

/// Default location of the optional config file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("wagerline").join("config.toml"))
}

fn default_user_agent() -> String {
    format!(
        "wagerline/{} ({})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    )
}

/// Configuration builder with fluent API
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    request_timeout: Option<Duration>,
    user_agent: Option<String>,
    credentials_path: Option<PathBuf>,
    in_memory_credentials: bool,
}

impl ClientConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    fn from_file(file: ConfigFile) -> Self {
        Self {
            base_url: file.api_url,
            request_timeout: file.timeout_secs.map(Duration::from_secs),
            user_agent: file.user_agent,
            credentials_path: file.credentials_path,
            in_memory_credentials: false,
        }
    }

    fn override_from_env(&mut self) -> Result<()> {
        if let Ok(val) = env::var(API_URL_ENV) {
            self.base_url = Some(val);
        }

        if let Ok(val) = env::var(CREDENTIALS_ENV) {
            self.credentials_path = Some(PathBuf::from(val));
        }

        if let Ok(val) = env::var(TIMEOUT_ENV) {
            let secs: u64 = val
                .parse()
                .map_err(|_| Error::Config(format!("Invalid {}: {}", TIMEOUT_ENV, val)))?;
            self.request_timeout = Some(Duration::from_secs(secs));
        }

        Ok(())
    }

    /// Set the authority base URL
    pub fn base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set custom user agent
    pub fn user_agent<S: Into<String>>(mut self, agent: S) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Persist credentials at a specific path
    pub fn credentials_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.credentials_path = Some(path.into());
        self.in_memory_credentials = false;
        self
    }

    /// Keep credentials in memory only
    pub fn in_memory_credentials(mut self) -> Self {
        self.credentials_path = None;
        self.in_memory_credentials = true;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ClientConfig> {
        let credentials_path = if self.in_memory_credentials {
            None
        } else {
            self.credentials_path.or_else(default_credentials_path)
        };

        let config = ClientConfig {
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            request_timeout: self.request_timeout.unwrap_or(Duration::from_secs(30)),
            user_agent: self.user_agent.unwrap_or_else(default_user_agent),
            credentials_path,
        };

        config.validate()?;
        Ok(config)
    }
}
