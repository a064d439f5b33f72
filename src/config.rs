//! Runtime configuration.
//!
//! Every setting has a default except the order API base URL, which only the
//! binary requires. Values come from `PAYMENT_RECONCILER_*` environment
//! variables:
//!
//! | Variable | Default |
//! |---|---|
//! | `PAYMENT_RECONCILER_API_BASE_URL` | none |
//! | `PAYMENT_RECONCILER_STATE_DIR` | `./state` |
//! | `PAYMENT_RECONCILER_HTTP_TIMEOUT_SECS` | 30 |
//! | `PAYMENT_RECONCILER_EFFECT_BUFFER` | 32 |
//! | `PAYMENT_RECONCILER_EVENT_BUFFER` | 32 |
//! | `PAYMENT_RECONCILER_SUCCESS_MARKERS` | `checkout/success,payment-success` |
//! | `PAYMENT_RECONCILER_CANCEL_MARKERS` | `checkout/cancel,payment-cancel` |
//! | `PAYMENT_RECONCILER_AUTH_TOKEN` | none (logged out) |

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::deeplink::DeepLinkMarkers;
use crate::types::AuthToken;

pub const ENV_API_BASE_URL: &str = "PAYMENT_RECONCILER_API_BASE_URL";
pub const ENV_STATE_DIR: &str = "PAYMENT_RECONCILER_STATE_DIR";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "PAYMENT_RECONCILER_HTTP_TIMEOUT_SECS";
pub const ENV_EFFECT_BUFFER: &str = "PAYMENT_RECONCILER_EFFECT_BUFFER";
pub const ENV_EVENT_BUFFER: &str = "PAYMENT_RECONCILER_EVENT_BUFFER";
pub const ENV_SUCCESS_MARKERS: &str = "PAYMENT_RECONCILER_SUCCESS_MARKERS";
pub const ENV_CANCEL_MARKERS: &str = "PAYMENT_RECONCILER_CANCEL_MARKERS";
pub const ENV_AUTH_TOKEN: &str = "PAYMENT_RECONCILER_AUTH_TOKEN";

const DEFAULT_STATE_DIR: &str = "./state";

/// Default order API timeout (30 seconds).
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

const DEFAULT_EFFECT_BUFFER: usize = 32;

const DEFAULT_EVENT_BUFFER: usize = 32;

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not set")]
    Missing { var: &'static str },

    #[error("{var} is not a valid URL: {source}")]
    InvalidUrl {
        var: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("{var} must be an http(s) URL, got {value:?}")]
    UnsupportedScheme { var: &'static str, value: String },

    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Which URI paths count as checkout return links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLinkConfig {
    pub success_markers: Vec<String>,
    pub cancel_markers: Vec<String>,
}

impl Default for DeepLinkConfig {
    fn default() -> Self {
        let markers = DeepLinkMarkers::default();
        DeepLinkConfig {
            success_markers: markers.success,
            cancel_markers: markers.cancel,
        }
    }
}

impl DeepLinkConfig {
    /// Builds the normalized marker set used by the parser.
    pub fn markers(&self) -> DeepLinkMarkers {
        DeepLinkMarkers::new(
            self.success_markers.iter().map(String::as_str),
            self.cancel_markers.iter().map(String::as_str),
        )
    }
}

/// Configuration for a reconciler process.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Base URL of the order API, e.g. `https://api.example.com/v1`.
    ///
    /// Optional here so library users can bring their own gateway.
    pub api_base_url: Option<String>,

    /// Directory holding the pending-payment slot file.
    pub state_dir: PathBuf,

    /// Transport timeout for one order lookup. A timeout counts as transient.
    pub http_timeout: Duration,

    /// Capacity of the outbound effect channel.
    pub effect_buffer: usize,

    /// Capacity of the inbound event queue and of each source's feed.
    pub event_buffer: usize,

    pub deep_links: DeepLinkConfig,

    /// Initial bearer token. `None` starts logged out.
    pub auth_token: Option<AuthToken>,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconcilerConfig {
    /// Creates a configuration with default values and no API URL.
    pub fn new() -> Self {
        ReconcilerConfig {
            api_base_url: None,
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            effect_buffer: DEFAULT_EFFECT_BUFFER,
            event_buffer: DEFAULT_EVENT_BUFFER,
            deep_links: DeepLinkConfig::default(),
            auth_token: None,
        }
    }

    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::new();

        let api_base_url = get(ENV_API_BASE_URL)
            .map(|v| validate_base_url(ENV_API_BASE_URL, v))
            .transpose()?;

        let http_timeout = match get(ENV_HTTP_TIMEOUT_SECS) {
            Some(v) => Duration::from_secs(parse_positive(ENV_HTTP_TIMEOUT_SECS, v)?),
            None => defaults.http_timeout,
        };

        let effect_buffer = match get(ENV_EFFECT_BUFFER) {
            Some(v) => parse_positive(ENV_EFFECT_BUFFER, v)? as usize,
            None => defaults.effect_buffer,
        };

        let event_buffer = match get(ENV_EVENT_BUFFER) {
            Some(v) => parse_positive(ENV_EVENT_BUFFER, v)? as usize,
            None => defaults.event_buffer,
        };

        let deep_links = DeepLinkConfig {
            success_markers: get(ENV_SUCCESS_MARKERS)
                .map(|v| split_list(&v))
                .unwrap_or(defaults.deep_links.success_markers),
            cancel_markers: get(ENV_CANCEL_MARKERS)
                .map(|v| split_list(&v))
                .unwrap_or(defaults.deep_links.cancel_markers),
        };

        Ok(ReconcilerConfig {
            api_base_url,
            state_dir: get(ENV_STATE_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.state_dir),
            http_timeout,
            effect_buffer,
            event_buffer,
            deep_links,
            auth_token: get(ENV_AUTH_TOKEN).map(AuthToken::new),
        })
    }

    /// Returns the API base URL, or an error naming the variable to set.
    pub fn require_api_base_url(&self) -> Result<&str> {
        self.api_base_url.as_deref().ok_or(ConfigError::Missing {
            var: ENV_API_BASE_URL,
        })
    }
}

fn validate_base_url(var: &'static str, value: String) -> Result<String> {
    let url = Url::parse(&value).map_err(|source| ConfigError::InvalidUrl { var, source })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::UnsupportedScheme { var, value });
    }
    Ok(value)
}

fn parse_positive(var: &'static str, value: String) -> Result<u64> {
    match value.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber { var, value }),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
