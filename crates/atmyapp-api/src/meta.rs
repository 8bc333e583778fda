//! Site metadata: the head configuration used to render page `<head>` tags.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::AtMyAppClient;
use crate::collections::QueryParams;
use crate::error::{ApiError, Error, Result};

/// Head configuration of a site. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadConfig {
    pub title: Option<String>,
    pub description: Option<String>,
    pub robots: Option<String>,

    pub canonical: Option<String>,
    pub sitemap: Option<String>,

    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub og_image: Option<String>,
    pub og_type: Option<String>,
    pub twitter_card: Option<String>,

    pub favicon: Option<String>,
    pub apple_touch_icon: Option<String>,
    pub theme_color: Option<String>,

    pub google_site_verification: Option<String>,

    pub json_ld: Option<Map<String, Value>>,

    pub analytics_id: Option<String>,
    pub analytics_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HeadConfigResponse {
    success: bool,
    #[serde(default)]
    data: Option<HeadConfig>,
}

fn head_config_error(site_id: &str, status: &str, message: &str) -> Error {
    Error::Request(format!(
        "failed to fetch head config for site \"{}\". Status: {}. Message: {}",
        site_id, status, message
    ))
}

impl AtMyAppClient {
    /// Fetches the head configuration of `site_id` from `/meta/sites/{id}/head`.
    pub async fn get_head_config(&self, site_id: &str) -> Result<HeadConfig> {
        let response: HeadConfigResponse = self
            .get_json(&["meta", "sites", site_id, "head"], &QueryParams::new())
            .await
            .map_err(|e| {
                let (status, message) = match self.normalize_error(e) {
                    ApiError::Http { status, message } => (status.to_string(), message),
                    ApiError::Auth { message } => ("401".to_string(), message),
                    ApiError::NotFound { .. } => ("404".to_string(), "Not Found".to_string()),
                    ApiError::RateLimit { .. } => ("429".to_string(), "Rate limited".to_string()),
                    other => ("unknown".to_string(), other.to_string()),
                };
                head_config_error(site_id, &status, &message)
            })?;

        match response {
            HeadConfigResponse {
                success: true,
                data: Some(config),
            } => Ok(config),
            _ => Err(head_config_error(site_id, "unknown", "unknown")),
        }
    }
}
