use camara_model::SortOrder;
use chrono::NaiveDate;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_aux::prelude::deserialize_vec_from_string_or_vec;
use std::time::Duration;

/// Crawler configuration loaded from multiple sources.
///
/// Configuration is loaded in priority order (lowest to highest):
/// 1. Struct defaults
/// 2. config.yaml file (if exists)
/// 3. Environment variables with CAMARA_ prefix (always wins)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base URL of the open-data API, without trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout, separate from any rate-limit wait.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Optional steady cap on outgoing requests, shared by all workers.
    #[serde(default)]
    pub requests_per_second: Option<u32>,

    /// Wait used when a 429 arrives without a usable `retry-after` header.
    #[serde(default = "default_fallback_retry_after_secs")]
    pub fallback_retry_after_secs: u64,
}

impl ApiConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub const fn fallback_retry_after(&self) -> Duration {
        Duration::from_secs(self.fallback_retry_after_secs)
    }
}

/// Retry budget for transient failures (5xx, transport errors, timeouts).
///
/// Rate-limit responses are not counted against it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl RetryConfig {
    /// Delay before retry number `attempt` (1-based), doubling from the
    /// initial backoff and clamped to the maximum.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let delay = self
            .initial_backoff_ms
            .saturating_mul(1_u64 << exponent)
            .min(self.max_backoff_ms);
        Duration::from_millis(delay)
    }
}

/// What the crawler does with a page whose records fail to decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Drop the page's records, count them, keep crawling.
    #[default]
    Skip,
    /// Fail the branch the page belongs to.
    Abort,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlConfig {
    /// Party acronyms to crawl. Accepts an array or a comma-separated string.
    #[serde(default, deserialize_with = "deserialize_codes")]
    pub parties: Vec<String>,

    /// Legislature ids. Accepts a number, an array or a comma-separated string.
    #[serde(default, deserialize_with = "deserialize_legislatures")]
    pub legislatures: Vec<u32>,

    #[serde(default)]
    pub start_date: Option<NaiveDate>,

    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    #[serde(default)]
    pub order: SortOrder,

    #[serde(default = "default_organization_sort")]
    pub organization_sort: Option<String>,

    #[serde(default)]
    pub member_sort: Option<String>,

    #[serde(default = "default_record_sort")]
    pub record_sort: Option<String>,

    /// Members whose records are fetched at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Stop following `next` links after this many pages.
    #[serde(default)]
    pub max_pages: Option<usize>,

    #[serde(default)]
    pub malformed_pages: MalformedPolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level filter (debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Deserialize codes from comma-separated string or array, filtering empty values.
fn deserialize_codes<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let codes: Vec<String> = deserialize_vec_from_string_or_vec(deserializer)?;
    Ok(codes
        .into_iter()
        .map(|code| code.trim().to_string())
        .filter(|code| !code.is_empty())
        .collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LegislaturesRepr {
    One(u32),
    List(Vec<u32>),
    Text(String),
}

/// Environment values like `56` arrive as numbers, `55,56` as strings.
fn deserialize_legislatures<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match LegislaturesRepr::deserialize(deserializer)? {
        LegislaturesRepr::One(id) => Ok(vec![id]),
        LegislaturesRepr::List(ids) => Ok(ids),
        LegislaturesRepr::Text(text) => text
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<u32>().map_err(|_| {
                    serde::de::Error::custom(format!("invalid legislature id '{part}'"))
                })
            })
            .collect(),
    }
}

fn default_base_url() -> String {
    "https://dadosabertos.camara.leg.br/api/v2".to_string()
}

// These functions cannot be const because serde uses function pointers for defaults
#[allow(clippy::missing_const_for_fn)]
fn default_timeout_secs() -> u64 {
    30
}

#[allow(clippy::missing_const_for_fn)]
fn default_fallback_retry_after_secs() -> u64 {
    5
}

#[allow(clippy::missing_const_for_fn)]
fn default_max_retries() -> u32 {
    5
}

#[allow(clippy::missing_const_for_fn)]
fn default_initial_backoff_ms() -> u64 {
    500
}

#[allow(clippy::missing_const_for_fn)]
fn default_max_backoff_ms() -> u64 {
    30_000
}

#[allow(clippy::unnecessary_wraps)]
fn default_organization_sort() -> Option<String> {
    Some("sigla".to_string())
}

#[allow(clippy::unnecessary_wraps)]
fn default_record_sort() -> Option<String> {
    Some("dataHoraInicio".to_string())
}

#[allow(clippy::missing_const_for_fn)]
fn default_concurrency() -> usize {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            requests_per_second: None,
            fallback_retry_after_secs: default_fallback_retry_after_secs(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            parties: Vec::new(),
            legislatures: Vec::new(),
            start_date: None,
            end_date: None,
            order: SortOrder::Asc,
            organization_sort: default_organization_sort(),
            member_sort: None,
            record_sort: default_record_sort(),
            concurrency: default_concurrency(),
            max_pages: None,
            malformed_pages: MalformedPolicy::Skip,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            retry: RetryConfig::default(),
            crawl: CrawlConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Sources are merged in priority order:
    /// 1. Struct defaults (lowest)
    /// 2. config.yaml file (if exists)
    /// 3. Environment variables with CAMARA_ prefix (highest)
    ///
    /// # Errors
    /// Returns an error if configuration cannot be loaded or is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config.yaml")
    }

    /// Load configuration with a custom YAML file path.
    ///
    /// # Errors
    /// Returns an error if configuration cannot be loaded or is invalid.
    pub fn load_from(yaml_path: &str) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(yaml_path).extract()?;

        config.validate()?;
        Ok(config)
    }

    /// The layered provider, exposed so callers can merge CLI overrides
    /// before extraction.
    #[must_use]
    pub fn figment(yaml_path: &str) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Yaml::file(yaml_path))
            .merge(Env::prefixed("CAMARA_").split("__"))
    }

    /// Validate configuration values shared by every command.
    ///
    /// Runs before any request is made, so a bad setup never reaches the API.
    ///
    /// # Errors
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(ConfigError::Validation(format!(
                "api.base_url must start with http:// or https://, got: '{}'",
                self.api.base_url
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "api.timeout_secs cannot be 0".into(),
            ));
        }

        if self.api.requests_per_second == Some(0) {
            return Err(ConfigError::Validation(
                "api.requests_per_second cannot be 0".into(),
            ));
        }

        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(ConfigError::Validation(
                "retry.initial_backoff_ms cannot exceed retry.max_backoff_ms".into(),
            ));
        }

        if let (Some(start), Some(end)) = (self.crawl.start_date, self.crawl.end_date) {
            if start > end {
                return Err(ConfigError::Validation(format!(
                    "crawl.start_date ({start}) is after crawl.end_date ({end})"
                )));
            }
        }

        if self.crawl.concurrency == 0 {
            return Err(ConfigError::Validation(
                "crawl.concurrency cannot be 0".into(),
            ));
        }

        if self.crawl.max_pages == Some(0) {
            return Err(ConfigError::Validation(
                "crawl.max_pages cannot be 0".into(),
            ));
        }

        Ok(())
    }

    /// Full validation for a crawl run: [`Config::validate`] plus the
    /// inputs only a crawl needs.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot drive a crawl.
    pub fn validate_for_crawl(&self) -> Result<(), ConfigError> {
        self.validate()?;

        if self.crawl.parties.is_empty() {
            return Err(ConfigError::Validation(
                "crawl.parties is required. Set CAMARA_CRAWL__PARTIES (e.g. \"NOVO,PL\") or configure in config.yaml.".into(),
            ));
        }

        Ok(())
    }
}
