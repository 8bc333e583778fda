//! HTTP client wrapper for the AtMyApp API.

use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::collections::QueryParams;
use crate::error::{ApiError, Error, Result};

/// Default base URL for the AtMyApp API.
pub const DEFAULT_BASE_URL: &str = "https://api.atmyapp.com";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Caching behaviour requested from the edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Allow responses up to a minute old.
    #[default]
    Default,
    /// Always revalidate.
    Priority,
}

impl FetchMode {
    /// The `Cache-Control` header value sent with every request.
    pub fn cache_control(&self) -> &'static str {
        match self {
            FetchMode::Default => "max-age=60",
            FetchMode::Priority => "no-cache",
        }
    }
}

/// Client for the AtMyApp API.
#[derive(Clone)]
pub struct AtMyAppClient {
    api_key: String,
    http_client: reqwest::Client,
    base_url: String,
    fetch_mode: FetchMode,
    request_timeout: Duration,
    preview_key: Option<String>,
    plugins: Option<Vec<String>>,
}

/// Builder for [`AtMyAppClient`].
#[derive(Debug, Clone)]
pub struct AtMyAppClientBuilder {
    api_key: String,
    base_url: String,
    fetch_mode: FetchMode,
    request_timeout: Duration,
    preview_key: Option<String>,
    plugins: Option<Vec<String>>,
}

impl AtMyAppClientBuilder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            fetch_mode: FetchMode::default(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            preview_key: None,
            plugins: None,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn fetch_mode(mut self, fetch_mode: FetchMode) -> Self {
        self.fetch_mode = fetch_mode;
        self
    }

    /// Sets the per-request timeout of the underlying HTTP client.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Preview key sent when a call does not supply its own.
    pub fn preview_key(mut self, preview_key: impl Into<String>) -> Self {
        self.preview_key = Some(preview_key.into());
        self
    }

    /// Plugins requested when a call does not supply its own.
    pub fn plugins<I, S>(mut self, plugins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plugins = Some(plugins.into_iter().map(Into::into).collect());
        self
    }

    pub fn build(self) -> Result<AtMyAppClient> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CACHE_CONTROL,
            HeaderValue::from_static(self.fetch_mode.cache_control()),
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(self.request_timeout)
            .build()?;

        Ok(AtMyAppClient {
            api_key: self.api_key,
            http_client,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            fetch_mode: self.fetch_mode,
            request_timeout: self.request_timeout,
            preview_key: self.preview_key,
            plugins: self.plugins,
        })
    }
}

impl AtMyAppClient {
    /// Creates a client with default settings.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        AtMyAppClientBuilder::new(api_key).build()
    }

    /// Creates a client against a custom base URL.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        AtMyAppClientBuilder::new(api_key).base_url(base_url).build()
    }

    pub fn builder(api_key: impl Into<String>) -> AtMyAppClientBuilder {
        AtMyAppClientBuilder::new(api_key)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn fetch_mode(&self) -> FetchMode {
        self.fetch_mode
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn preview_key(&self) -> Option<&str> {
        self.preview_key.as_deref()
    }

    pub fn plugins(&self) -> Option<&[String]> {
        self.plugins.as_deref()
    }

    /// Builds `{base_url}/{segments...}?{query}`. Segments are percent-encoded.
    pub fn endpoint_url<S: AsRef<str>>(&self, segments: &[S], query: &QueryParams) -> Result<Url> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| Error::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| Error::InvalidUrl(self.base_url.clone()))?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment.as_ref());
            }
        }
        if !query.is_empty() {
            url.set_query(Some(&query.to_query_string()));
        }
        Ok(url)
    }

    /// Performs an authenticated GET and decodes the JSON body.
    pub async fn get_json<T, S>(&self, segments: &[S], query: &QueryParams) -> Result<T>
    where
        T: DeserializeOwned,
        S: AsRef<str>,
    {
        let url = self.endpoint_url(segments, query)?;
        tracing::debug!(url = %url.path(), params = query.len(), "GET");

        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Performs an authenticated POST with a JSON body and decodes the JSON
    /// response.
    pub async fn post_json<T, B, S>(&self, segments: &[S], body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
        S: AsRef<str>,
    {
        let url = self.endpoint_url(segments, &QueryParams::new())?;
        tracing::debug!(url = %url.path(), "POST");

        let response = self
            .http_client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            let bytes = response.bytes().await?;
            // An empty success body decodes as `null`
            let bytes: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
                b"null"
            } else {
                &bytes
            };
            let body = serde_json::from_slice::<T>(bytes)?;
            return Ok(body);
        }

        Err(self.parse_error_response(response).await)
    }

    /// Normalizes a non-2xx response into an [`ApiError`] kind.
    async fn parse_error_response(&self, response: reqwest::Response) -> Error {
        let status = response.status();
        let status_code = status.as_u16();

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body);

        let api_error = match status_code {
            401 | 403 => ApiError::Auth {
                message: message.unwrap_or_else(|| "Authentication failed".to_string()),
            },
            404 => ApiError::NotFound {
                resource: "resource".to_string(),
                id: message.unwrap_or_else(|| "unknown".to_string()),
            },
            429 => ApiError::RateLimit { retry_after },
            _ => ApiError::Http {
                status: status_code,
                message: message.unwrap_or_else(|| {
                    status.canonical_reason().unwrap_or("Unknown error").to_string()
                }),
            },
        };

        Error::Api(api_error)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Nested { error: NestedError },
    Flat { message: String },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NestedError {
    Message(String),
    Object { message: String },
}

/// Pulls a human-readable message out of an error body.
///
/// Accepts `{"error": "..."}`, `{"error": {"message": "..."}}` and
/// `{"message": "..."}`; any other non-empty body is used verbatim.
pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<ErrorBody>(trimmed) {
        Ok(ErrorBody::Nested {
            error: NestedError::Message(message) | NestedError::Object { message },
        }) => Some(message),
        Ok(ErrorBody::Flat { message }) => Some(message),
        Err(_) => Some(trimmed.to_string()),
    }
}

impl fmt::Debug for AtMyAppClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtMyAppClient")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("fetch_mode", &self.fetch_mode)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
