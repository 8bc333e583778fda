//! Storage endpoints: raw files, typed assets and their static URLs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::AtMyAppClient;
use crate::collections::QueryParams;
use crate::error::{ApiError, Error, Result};

/// Collapses repeated slashes and strips leading and trailing ones.
pub fn clean_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StaticUrlData {
    static_url: String,
}

#[derive(Debug, Deserialize)]
struct StaticUrlResponse {
    success: bool,
    #[serde(default)]
    data: Option<StaticUrlData>,
}

/// How a stored file is presented to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    #[default]
    File,
    Content,
    Image,
    Icon,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::File => "file",
            AssetKind::Content => "content",
            AssetKind::Image => "image",
            AssetKind::Icon => "icon",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "file" => Ok(AssetKind::File),
            "content" => Ok(AssetKind::Content),
            "image" => Ok(AssetKind::Image),
            "icon" => Ok(AssetKind::Icon),
            other => Err(format!("Unsupported mode: {}", other)),
        }
    }
}

/// Failure attached to a [`StoredAsset`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl AssetError {
    fn from_error(error: &Error) -> Self {
        match error.as_api_error() {
            Some(ApiError::NotFound { .. }) => AssetError {
                message: "File not found".to_string(),
                status: Some(404),
            },
            Some(ApiError::Auth { .. }) => AssetError {
                message: "Wrong API key".to_string(),
                status: Some(401),
            },
            Some(ApiError::Http { status, message }) => AssetError {
                message,
                status: Some(status),
            },
            Some(ApiError::RateLimit { .. }) => AssetError {
                message: error.to_string(),
                status: Some(429),
            },
            _ => AssetError {
                message: error.to_string(),
                status: None,
            },
        }
    }
}

/// A stored file fetched as a given [`AssetKind`].
///
/// Failures are carried in `error` rather than returned, so a page can render
/// a placeholder for a missing asset. For [`AssetKind::Content`] the value is
/// the parsed document; for the other kinds it is the file payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAsset {
    pub kind: AssetKind,
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AssetError>,
}

impl StoredAsset {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl AtMyAppClient {
    fn storage_query(&self, preview_key: Option<&str>) -> QueryParams {
        let mut query = QueryParams::new();
        let key = preview_key
            .filter(|k| !k.is_empty())
            .or(self.preview_key().filter(|k| !k.is_empty()));
        if let Some(key) = key {
            query.set("amaPreviewKey", key);
        }
        query
    }

    fn storage_segments<'a>(prefix: &'a str, path: &'a str) -> Vec<&'a str> {
        std::iter::once("storage")
            .chain(std::iter::once(prefix))
            .chain(path.split('/').filter(|s| !s.is_empty()))
            .collect()
    }

    /// Fetches the JSON document stored at `path`.
    pub async fn get_from_path(&self, path: &str, preview_key: Option<&str>) -> Result<Value> {
        let path = clean_path(path);
        let segments = Self::storage_segments("f", &path);
        self.get_json(&segments, &self.storage_query(preview_key))
            .await
    }

    /// Fetches the file at `path` and presents it as `kind`.
    ///
    /// A 404 reads as "File not found" and a rejected key as "Wrong API key";
    /// other failures keep the service message.
    pub async fn get_asset(&self, path: &str, kind: AssetKind) -> StoredAsset {
        match self.get_from_path(path, None).await {
            Ok(Value::Null) => StoredAsset {
                kind,
                value: None,
                error: Some(AssetError {
                    message: "Empty response".to_string(),
                    status: None,
                }),
            },
            Ok(value) => StoredAsset {
                kind,
                value: Some(value),
                error: None,
            },
            Err(e) => {
                tracing::debug!(path, kind = %kind, error = %e, "Asset fetch failed");
                StoredAsset {
                    kind,
                    value: None,
                    error: Some(AssetError::from_error(&e)),
                }
            }
        }
    }

    /// Resolves the public static URL of the file stored at `path`.
    pub async fn get_static_url(&self, path: &str, preview_key: Option<&str>) -> Result<String> {
        let path = clean_path(path);
        let segments = Self::storage_segments("static", &path);
        let response: StaticUrlResponse = self
            .get_json(&segments, &self.storage_query(preview_key))
            .await?;

        match response {
            StaticUrlResponse {
                success: true,
                data: Some(data),
            } => Ok(data.static_url),
            _ => Err(Error::Request("Failed to get static URL".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("/a//b///c/"), "a/b/c");
        assert_eq!(clean_path("plain"), "plain");
        assert_eq!(clean_path("///"), "");
        assert_eq!(clean_path(""), "");
    }

    #[test]
    fn test_asset_kind_parse() {
        assert_eq!("image".parse::<AssetKind>(), Ok(AssetKind::Image));
        assert_eq!(AssetKind::default(), AssetKind::File);
        assert_eq!(
            "video".parse::<AssetKind>().unwrap_err(),
            "Unsupported mode: video"
        );
    }

    #[test]
    fn test_asset_error_mapping() {
        let not_found = Error::Api(ApiError::NotFound {
            resource: "resource".into(),
            id: "x".into(),
        });
        assert_eq!(
            AssetError::from_error(&not_found),
            AssetError {
                message: "File not found".into(),
                status: Some(404)
            }
        );

        let auth = Error::Api(ApiError::Auth {
            message: "nope".into(),
        });
        assert_eq!(AssetError::from_error(&auth).message, "Wrong API key");

        let http = Error::Api(ApiError::Http {
            status: 500,
            message: "boom".into(),
        });
        assert_eq!(AssetError::from_error(&http).status, Some(500));
    }

    #[test]
    fn test_storage_segments() {
        assert_eq!(
            AtMyAppClient::storage_segments("f", "docs/about.json"),
            vec!["storage", "f", "docs", "about.json"]
        );
    }

    #[test]
    fn test_storage_query_preview_key_fallback() {
        let client = AtMyAppClient::builder("k").preview_key("client").build().unwrap();
        assert_eq!(client.storage_query(None).get("amaPreviewKey"), Some("client"));
        assert_eq!(client.storage_query(Some("call")).get("amaPreviewKey"), Some("call"));

        let bare = AtMyAppClient::new("k").unwrap();
        assert!(bare.storage_query(None).is_empty());
    }
}
