//! Configuration management.
//!
//! Configuration is an explicit value handed to the search engine at
//! construction. It can be loaded from a TOML file and overridden by
//! `MEDLIT__`-prefixed environment variables:
//!
//! ```toml
//! [http]
//! timeout_secs = 30
//! connect_timeout_secs = 10
//! user_agent = "medlit-search/0.1"
//!
//! [endpoints]
//! eutils_base_url = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils"
//! koreamed_search_url = "https://koreamed.org/SearchBasic.php"
//! ncbi_api_key = "optional-key"
//!
//! [search]
//! inter_backend_delay_ms = 500
//! strict_id_matching = false
//!
//! [retry]
//! max_attempts = 2
//! initial_delay_ms = 1000
//! ```
//!
//! `MEDLIT__HTTP__TIMEOUT_SECS=60` overrides `http.timeout_secs`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::RetryConfig;

/// Name of the configuration file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "medlit.toml";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Backend endpoint URLs
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Aggregation behavior
    #[serde(default)]
    pub search: SearchConfig,

    /// Retry policy for transient failures
    #[serde(default)]
    pub retry: RetryConfig,
}

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// User-Agent header sent to every backend
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

/// Backend endpoint URLs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Base URL of the NCBI E-utilities (`esearch.fcgi`, `efetch.fcgi`)
    #[serde(default = "default_eutils_base_url")]
    pub eutils_base_url: String,

    /// KoreaMed search form target
    #[serde(default = "default_koreamed_search_url")]
    pub koreamed_search_url: String,

    /// NCBI API key, raising the E-utilities rate limit
    #[serde(default)]
    pub ncbi_api_key: Option<String>,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            eutils_base_url: default_eutils_base_url(),
            koreamed_search_url: default_koreamed_search_url(),
            ncbi_api_key: None,
        }
    }
}

fn default_eutils_base_url() -> String {
    "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string()
}

fn default_koreamed_search_url() -> String {
    "https://koreamed.org/SearchBasic.php".to_string()
}

/// Aggregation behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Minimum pause between consecutive backend invocations
    #[serde(default = "default_inter_backend_delay")]
    pub inter_backend_delay_ms: u64,

    /// Drop full-text records that cannot be matched to a search-phase id
    /// instead of assigning them by position
    #[serde(default)]
    pub strict_id_matching: bool,
}

impl SearchConfig {
    pub fn inter_backend_delay(&self) -> Duration {
        Duration::from_millis(self.inter_backend_delay_ms)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            inter_backend_delay_ms: default_inter_backend_delay(),
            strict_id_matching: false,
        }
    }
}

fn default_inter_backend_delay() -> u64 {
    500
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(String),
}

impl Config {
    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

/// Load configuration from an optional file plus `MEDLIT__*` environment
/// variables. Missing values fall back to defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix("MEDLIT")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Locate a configuration file: `./medlit.toml`, then
/// `<config dir>/medlit-search/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("medlit-search").join("config.toml"))
        .filter(|path| path.is_file())
}
