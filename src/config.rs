//! Credentials file loading.
//!
//! The client reads a YAML file, `google-ads.yaml` in the home directory by
//! default, holding the developer token and OAuth refresh credentials:
//!
//! ```yaml
//! developer_token: INSERT_DEVELOPER_TOKEN
//! client_id: INSERT_OAUTH2_CLIENT_ID
//! client_secret: INSERT_OAUTH2_CLIENT_SECRET
//! refresh_token: INSERT_REFRESH_TOKEN
//! # login_customer_id: INSERT_LOGIN_CUSTOMER_ID
//! # endpoint: googleads.googleapis.com
//! ```

use std::env;
use std::path::{Path, PathBuf};

use secrecy::Secret;
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "google-ads.yaml";
pub const CONFIG_PATH_ENV_VAR: &str = "GOOGLE_ADS_CONFIGURATION_FILE_PATH";
pub const DEFAULT_ENDPOINT: &str = "googleads.googleapis.com";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_API_VERSION: &str = "v0";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Cannot locate google-ads.yaml: HOME is not set")]
    NoHomeDirectory,
    #[error("Missing required configuration key: {0}")]
    MissingKey(&'static str),
    #[error(
        "Invalid login_customer_id {0:?}: must be a string of exactly 10 digits without dashes"
    )]
    InvalidLoginCustomerId(String),
    #[error("Failed to read configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Raw file contents; every key is optional until validated.
#[derive(Debug, Deserialize)]
struct RawConfig {
    developer_token: Option<Secret<String>>,
    client_id: Option<String>,
    client_secret: Option<Secret<String>>,
    refresh_token: Option<Secret<String>>,
    login_customer_id: Option<String>,
    endpoint: Option<String>,
    token_uri: Option<String>,
    api_version: Option<String>,
}

/// Validated client configuration
#[derive(Debug)]
pub struct GoogleAdsConfig {
    pub developer_token: Secret<String>,
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub refresh_token: Secret<String>,
    pub login_customer_id: Option<String>,
    /// API host or full base URL
    pub endpoint: String,
    pub token_uri: String,
    pub api_version: String,
}

impl GoogleAdsConfig {
    pub fn new(
        developer_token: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            developer_token: Secret::new(developer_token.into()),
            client_id: client_id.into(),
            client_secret: Secret::new(client_secret.into()),
            refresh_token: Secret::new(refresh_token.into()),
            login_customer_id: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    /// Sets the manager account used for the `login-customer-id` header
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidLoginCustomerId` unless the id is 10 digits
    pub fn with_login_customer_id(mut self, id: impl Into<String>) -> Result<Self, ConfigError> {
        let id = id.into();
        validate_login_customer_id(&id)?;
        self.login_customer_id = Some(id);
        Ok(self)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }

    /// Loads the configuration from a YAML file.
    ///
    /// Lookup order: `path`, then `GOOGLE_ADS_CONFIGURATION_FILE_PATH`, then
    /// `$HOME/google-ads.yaml`.
    ///
    /// # Errors
    /// Fails when the file is missing or unreadable, a required key is
    /// absent, or `login_customer_id` is malformed.
    pub fn load_from_storage(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => default_config_path()?,
        };

        if !path.is_file() {
            return Err(ConfigError::NotFound(path));
        }

        tracing::debug!("Loading Google Ads configuration from {}", path.display());

        let raw: RawConfig = ::config::Config::builder()
            .add_source(::config::File::from(path.as_path()).format(::config::FileFormat::Yaml))
            .build()?
            .try_deserialize()?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let developer_token = raw
            .developer_token
            .ok_or(ConfigError::MissingKey("developer_token"))?;
        let client_id = raw.client_id.ok_or(ConfigError::MissingKey("client_id"))?;
        let client_secret = raw
            .client_secret
            .ok_or(ConfigError::MissingKey("client_secret"))?;
        let refresh_token = raw
            .refresh_token
            .ok_or(ConfigError::MissingKey("refresh_token"))?;

        if let Some(id) = &raw.login_customer_id {
            validate_login_customer_id(id)?;
        }

        Ok(Self {
            developer_token,
            client_id,
            client_secret,
            refresh_token,
            login_customer_id: raw.login_customer_id,
            endpoint: raw.endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            token_uri: raw.token_uri.unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            api_version: raw
                .api_version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
        })
    }
}

fn default_config_path() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = env::var(CONFIG_PATH_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }
    let home = env::var_os("HOME").ok_or(ConfigError::NoHomeDirectory)?;
    Ok(PathBuf::from(home).join(CONFIG_FILE_NAME))
}

fn validate_login_customer_id(id: &str) -> Result<(), ConfigError> {
    if id.len() == 10 && id.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ConfigError::InvalidLoginCustomerId(id.to_string()))
    }
}
