//! Session-cookie HTTP client with CSRF echo and GET caching.

use std::fmt;
use std::sync::Arc;

use reqwest::Method;
use reqwest::cookie::{CookieStore, Jar};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::cache::{CacheStats, ResponseCache, cache_key};
use super::config::ApiConfig;
use super::error::{ApiError, ApiResult};
use crate::clock::{Clock, SystemClock};

/// REST client for the robots backend.
///
/// Cookies persist across calls in a shared jar, so a login made through
/// this client authenticates every later call.
pub struct ApiClient {
    config: ApiConfig,
    http: reqwest::Client,
    jar: Arc<Jar>,
    base: Url,
    cache: ResponseCache,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.base_url)
            .field("cache", &self.cache.stats())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client using the system clock.
    ///
    /// # Errors
    /// Returns an error if the config is invalid or the HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> ApiResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a client from environment configuration.
    ///
    /// # Errors
    /// Returns an error if the resulting config is invalid.
    pub fn from_env() -> ApiResult<Self> {
        Self::new(ApiConfig::from_env())
    }

    /// Create a client whose cache reads time from `clock`.
    ///
    /// # Errors
    /// Returns an error if the config is invalid or the HTTP client cannot be built.
    pub fn with_clock(config: ApiConfig, clock: Arc<dyn Clock>) -> ApiResult<Self> {
        config.validate()?;
        let base = Url::parse(config.base_url.trim_end_matches('/'))?;
        let jar = Arc::new(Jar::default());
        let http = Self::build_client(&config, Arc::clone(&jar))?;
        let cache = ResponseCache::new(config.cache.clone(), clock);

        tracing::debug!(base_url = %base, "API client ready");
        Ok(Self {
            config,
            http,
            jar,
            base,
            cache,
        })
    }

    fn build_client(config: &ApiConfig, jar: Arc<Jar>) -> ApiResult<reqwest::Client> {
        use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("x-requested-with"),
            HeaderValue::from_static("XMLHttpRequest"),
        );

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .cookie_provider(jar)
            .gzip(true)
            .build()
            .map_err(|e| ApiError::HttpClient(e.to_string()))
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Response cache statistics.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop all cached GET responses.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Absolute URL for an endpoint path such as `/robots/`.
    ///
    /// # Errors
    /// Returns an error if the joined URL does not parse.
    pub fn url(&self, path: &str) -> ApiResult<Url> {
        let base = self.base.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{}", path.trim_start_matches('/')))?)
    }

    /// Current CSRF token, read from the cookie jar.
    #[must_use]
    pub fn csrf_token(&self) -> Option<String> {
        let header = self.jar.cookies(&self.base)?;
        let cookies = header.to_str().ok()?;
        cookies.split(';').map(str::trim).find_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            if name != self.config.csrf_cookie_name {
                return None;
            }
            Some(
                urlencoding::decode(value)
                    .map_or_else(|_| value.to_string(), std::borrow::Cow::into_owned),
            )
        })
    }

    /// GET through the response cache.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> ApiResult<T> {
        let url = self.url(path)?;
        let key = cache_key("GET", url.as_str(), params);
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(%url, "cache hit");
            return Ok(serde_json::from_value(cached)?);
        }

        let epoch = self.cache.epoch();
        let request = self.http.get(url).query(params);
        let body = self.execute(request, false).await?;
        if !self.cache.set_if_epoch(&key, body.clone(), epoch) {
            tracing::debug!(key = %key, "response not cached");
        }
        Ok(serde_json::from_value(body)?)
    }

    /// GET bypassing the cache.
    pub async fn get_fresh<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let request = self.http.get(self.url(path)?);
        let body = self.execute(request, false).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Mutating request with a JSON body.
    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.http.request(method, self.url(path)?).json(body);
        let body = self.execute(request, true).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Mutating request with a urlencoded form body.
    pub async fn send_form<B, T>(&self, method: Method, path: &str, form: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.http.request(method, self.url(path)?).form(form);
        let body = self.execute(request, true).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Mutating request with a multipart body.
    pub async fn send_multipart<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> ApiResult<T> {
        let request = self.http.request(method, self.url(path)?).multipart(form);
        let body = self.execute(request, true).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Mutating request without a body.
    pub async fn send_empty<T: DeserializeOwned>(&self, method: Method, path: &str) -> ApiResult<T> {
        let request = self.http.request(method, self.url(path)?);
        let body = self.execute(request, true).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Send a request and return its JSON body (`null` when empty).
    ///
    /// Mutating requests carry the CSRF header and clear the cache on success.
    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
        mutating: bool,
    ) -> ApiResult<serde_json::Value> {
        let request = if mutating {
            self.attach_csrf(request)
        } else {
            request
        };

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "request rejected");
            return Err(ApiError::from_status(status.as_u16(), &text));
        }
        if mutating {
            self.cache.clear();
        }
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn attach_csrf(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.csrf_token() {
            Some(token) => request.header(self.config.csrf_header_name.as_str(), token),
            None => {
                tracing::warn!("CSRF token not found in cookies");
                request
            }
        }
    }
}
