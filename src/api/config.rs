//! Configuration for the REST client.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{ApiError, ApiResult};

/// Base URL used when no environment override is present.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Full API base URL, e.g. `https://example.com/api`.
const BASE_URL_ENV: &str = "SIDREX_API_BASE_URL";
/// Backend origin; `/api` is appended.
const ORIGIN_ENV: &str = "SIDREX_API_URL";
/// Request timeout override in seconds.
const TIMEOUT_ENV: &str = "SIDREX_API_TIMEOUT_SECS";

/// Configuration for [`ApiClient`](super::ApiClient).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to.
    pub base_url: String,
    /// Upper bound for a whole request.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
    /// Upper bound for establishing a connection.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
    /// Cookie holding the anti-forgery token.
    pub csrf_cookie_name: String,
    /// Header the anti-forgery token is echoed in.
    pub csrf_header_name: String,
    /// Longest chat message accepted, in characters.
    pub max_message_chars: usize,
    /// GET response cache settings.
    pub cache: CacheConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            csrf_cookie_name: "csrftoken".to_string(),
            csrf_header_name: "X-CSRFToken".to_string(),
            max_message_chars: 1000,
            cache: CacheConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Create a config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from `SIDREX_API_BASE_URL`, `SIDREX_API_URL` and
    /// `SIDREX_API_TIMEOUT_SECS`, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(base) = std::env::var(BASE_URL_ENV) {
            config.base_url = base;
        } else if let Ok(origin) = std::env::var(ORIGIN_ENV) {
            config.base_url = format!("{}/api", origin.trim_end_matches('/'));
        }

        if let Some(secs) = std::env::var(TIMEOUT_ENV)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.request_timeout = Duration::from_secs(secs);
        }

        config
    }

    /// Set the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Replace the cache settings.
    #[must_use]
    pub const fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Check invariants.
    ///
    /// # Errors
    /// Returns an error if the base URL does not parse or limits are zero.
    pub fn validate(&self) -> ApiResult<()> {
        let url = url::Url::parse(&self.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ApiError::Config(format!(
                "base_url must be http(s), got {}",
                url.scheme()
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(ApiError::Config("request_timeout must be > 0".to_string()));
        }
        if self.max_message_chars == 0 {
            return Err(ApiError::Config(
                "max_message_chars must be > 0".to_string(),
            ));
        }
        if self.cache.enabled && self.cache.max_entries == 0 {
            return Err(ApiError::Config(
                "cache.max_entries must be > 0 when the cache is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// GET response cache settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether GET responses are cached.
    pub enabled: bool,
    /// Lifetime of a cached response.
    #[serde(with = "duration_serde")]
    pub ttl: Duration,
    /// Entry cap; the oldest entry is evicted first.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(300),
            max_entries: 100,
        }
    }
}

impl CacheConfig {
    /// A disabled cache.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            ttl: Duration::from_secs(0),
            max_entries: 0,
        }
    }
}

/// Durations as whole seconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ApiConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.max_message_chars, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_overrides() {
        let config = ApiConfig::new()
            .with_base_url("https://sidrex.example/api")
            .with_timeout(Duration::from_secs(5))
            .with_cache(CacheConfig::disabled());

        assert_eq!(config.base_url, "https://sidrex.example/api");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert!(!config.cache.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_non_http_base_url() {
        let config = ApiConfig::new().with_base_url("ftp://sidrex.example/api");
        assert!(matches!(config.validate(), Err(ApiError::Config(_))));

        let config = ApiConfig::new().with_base_url("not a url");
        assert!(matches!(config.validate(), Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn durations_serialize_as_seconds() {
        let json = serde_json::to_value(CacheConfig::default()).unwrap();
        assert_eq!(json["ttl"], 300);

        let parsed: CacheConfig =
            serde_json::from_str(r#"{"enabled":true,"ttl":12,"max_entries":3}"#).unwrap();
        assert_eq!(parsed.ttl, Duration::from_secs(12));
    }
}
