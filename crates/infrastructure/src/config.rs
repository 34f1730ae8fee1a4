//! Client configuration.
//!
//! Settings come from an optional TOML file layered under environment
//! variables prefixed `SHELFSCAN_`, e.g. `SHELFSCAN_API_KEY`.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use shelfscan_domain::{DEFAULT_PAGE_SIZE, DomainError, PageRequest};
use thiserror::Error;
use url::Url;

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "shelfscan.toml";

/// Prefix of the environment variables read.
pub const ENV_PREFIX: &str = "SHELFSCAN";

/// Request timeout when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("configuration error: {0}")]
    Source(#[from] config::ConfigError),

    /// No API key was configured.
    #[error("API key is missing; set SHELFSCAN_API_KEY or api_key in the config file")]
    MissingApiKey,

    /// No base URL was configured.
    #[error("base URL is missing; set SHELFSCAN_BASE_URL or base_url in the config file")]
    MissingBaseUrl,

    /// The base URL does not parse or is not HTTP(S).
    #[error("invalid base URL {url}: {message}")]
    InvalidBaseUrl {
        /// The configured value.
        url: String,
        /// Why it was refused.
        message: String,
    },

    /// The page size is out of range.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Settings as read from the sources, before validation.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    base_url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
    page_size: Option<u32>,
}

/// Validated client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root; endpoint paths are appended to it.
    pub base_url: Url,
    /// Value of the `X-API-Key` header.
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Default page size for listings.
    pub page_size: u32,
}

impl ClientConfig {
    /// Creates a config with default timeout and page size.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an empty key or an unusable base URL.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, ConfigError> {
        Self::from_raw(RawConfig {
            base_url: Some(base_url.to_string()),
            api_key: Some(api_key.into()),
            ..RawConfig::default()
        })
    }

    /// Loads from `file` (or `shelfscan.toml` if present) and the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an explicitly named file is missing, a source
    /// does not parse, or a required setting is absent or invalid.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(file, None)
    }

    /// Like `load`, but reads variables from `env` instead of the process
    /// environment when given.
    ///
    /// # Errors
    ///
    /// See `load`.
    pub fn load_from(
        file: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let file_source = match file {
            Some(path) => File::from(path).format(FileFormat::Toml).required(true),
            None => File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
        };
        let settings = Config::builder()
            .add_source(file_source)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        Self::from_raw(settings.try_deserialize()?)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let url = raw
            .base_url
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingBaseUrl)?;
        let base_url = parse_base_url(&url)?;

        let api_key = raw
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let page_size = raw.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        PageRequest::first(page_size)?;

        Ok(Self {
            base_url,
            api_key,
            timeout: Duration::from_secs(raw.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            page_size,
        })
    }
}

fn parse_base_url(url: &str) -> Result<Url, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidBaseUrl {
        url: url.to_string(),
        message,
    };
    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", parsed.scheme())));
    }
    if parsed.cannot_be_a_base() {
        return Err(invalid("not a base URL".to_string()));
    }
    Ok(parsed)
}
