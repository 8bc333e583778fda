//! Remote collections endpoint.

use super::params::{build_params, QueryParams};
use super::types::{ListOptions, ResponseEnvelope};
use crate::client::AtMyAppClient;
use crate::error::{ApiError, Error, QueryError, Result};

/// Plugins requested when neither the call nor the client names any.
pub const DEFAULT_PLUGINS: [&str; 1] = ["static-url"];

/// Builds the full wire parameters for a list request: the compiled query plus
/// `plugins` and `amaPreviewKey`.
///
/// Plugins and preview key fall back to the given defaults when `options`
/// leaves them unset (an empty preview key counts as unset). An explicitly
/// empty plugin list omits the parameter.
pub fn wire_params(
    options: &ListOptions,
    default_plugins: Option<&[String]>,
    default_preview_key: Option<&str>,
) -> std::result::Result<QueryParams, QueryError> {
    let mut params = build_params(options)?;

    let plugins: Vec<&str> = match options.plugins.as_deref().or(default_plugins) {
        Some(plugins) => plugins.iter().map(String::as_str).collect(),
        None => DEFAULT_PLUGINS.to_vec(),
    };
    if !plugins.is_empty() {
        params.set("plugins", plugins.join(","));
    }

    let preview_key = options
        .preview_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .or(default_preview_key.filter(|k| !k.is_empty()));
    if let Some(key) = preview_key {
        params.set("amaPreviewKey", key);
    }

    Ok(params)
}

impl AtMyAppClient {
    /// GETs `/collections/{collection}/entries` with the given parameters.
    ///
    /// Transport failures are returned as errors; use [`list_entries`] for the
    /// envelope-normalized form.
    ///
    /// [`list_entries`]: AtMyAppClient::list_entries
    pub async fn fetch_entries(&self, collection: &str, params: &QueryParams) -> Result<ResponseEnvelope> {
        self.get_json(&["collections", collection, "entries"], params)
            .await
    }

    /// Lists entries of `collection` from the service.
    ///
    /// Query compilation errors are returned as `Err` before any request is
    /// made. Every transport failure (network error, non-2xx status,
    /// undecodable body) is folded into a `success: false` envelope.
    pub async fn list_entries(&self, collection: &str, options: &ListOptions) -> Result<ResponseEnvelope> {
        let params = wire_params(options, self.plugins(), self.preview_key())?;
        tracing::debug!(collection, params = params.len(), "Fetching collection entries");

        match self.fetch_entries(collection, &params).await {
            Ok(envelope) => Ok(envelope),
            Err(e) => {
                let api_error = self.normalize_error(e);
                tracing::debug!(collection, error = %api_error, "Collections request failed");
                Ok(ResponseEnvelope::failure(api_error.to_string()))
            }
        }
    }

    /// Maps any transport-side error to its [`ApiError`] kind.
    pub fn normalize_error(&self, error: Error) -> ApiError {
        match error {
            Error::Http(e) if e.is_timeout() => ApiError::Timeout {
                after_ms: u64::try_from(self.request_timeout().as_millis()).unwrap_or(u64::MAX),
            },
            Error::Request(message) => ApiError::Service { message },
            other => other.as_api_error().unwrap_or_else(|| ApiError::Service {
                message: other.to_string(),
            }),
        }
    }
}
