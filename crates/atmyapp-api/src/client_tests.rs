//! Unit and wiremock tests for the AtMyAppClient.

use super::*;
use crate::error::{ApiError, Error};

#[test]
fn test_client_stores_api_key() {
    let client = AtMyAppClient::new("my-secret-key").unwrap();
    assert_eq!(client.api_key(), "my-secret-key");
}

#[test]
fn test_client_is_clone() {
    let client = AtMyAppClient::new("test-key").unwrap();
    let _cloned = client.clone();
}

#[test]
fn test_client_debug_redacts_api_key() {
    let client = AtMyAppClient::new("test-key").unwrap();
    let debug_str = format!("{:?}", client);
    assert!(
        !debug_str.contains("test-key"),
        "API key should be redacted in debug output"
    );
}

#[test]
fn test_client_default_base_url() {
    let client = AtMyAppClient::new("test-key").unwrap();
    assert_eq!(client.base_url(), DEFAULT_BASE_URL);
}

#[test]
fn test_client_with_custom_base_url_trims_slash() {
    let client = AtMyAppClient::with_base_url("test-key", "https://test.example.com/v0/").unwrap();
    assert_eq!(client.base_url(), "https://test.example.com/v0");
}

#[test]
fn test_builder_default_values() {
    let client = AtMyAppClientBuilder::new("test-key").build().unwrap();

    assert_eq!(client.fetch_mode(), FetchMode::Default);
    assert_eq!(
        client.request_timeout(),
        Duration::from_secs(DEFAULT_TIMEOUT_SECS)
    );
    assert_eq!(client.preview_key(), None);
    assert_eq!(client.plugins(), None);
}

#[test]
fn test_builder_chaining() {
    let client = AtMyAppClient::builder("test-key")
        .base_url("https://custom.example.com")
        .fetch_mode(FetchMode::Priority)
        .request_timeout(Duration::from_secs(5))
        .preview_key("pk")
        .plugins(["static-url", "resolve"])
        .build()
        .unwrap();

    assert_eq!(client.base_url(), "https://custom.example.com");
    assert_eq!(client.fetch_mode(), FetchMode::Priority);
    assert_eq!(client.request_timeout(), Duration::from_secs(5));
    assert_eq!(client.preview_key(), Some("pk"));
    assert_eq!(
        client.plugins(),
        Some(&["static-url".to_string(), "resolve".to_string()][..])
    );
}

#[test]
fn test_fetch_mode_cache_control() {
    assert_eq!(FetchMode::Default.cache_control(), "max-age=60");
    assert_eq!(FetchMode::Priority.cache_control(), "no-cache");
}

#[test]
fn test_endpoint_url_encodes_segments() {
    let client = AtMyAppClient::with_base_url("k", "https://api.example.com/v0").unwrap();
    let mut query = QueryParams::new();
    query.set("limit", "5");
    let url = client
        .endpoint_url(&["collections", "my orders", "entries"], &query)
        .unwrap();
    assert_eq!(
        url.as_str(),
        "https://api.example.com/v0/collections/my%20orders/entries?limit=5"
    );
}

#[test]
fn test_endpoint_url_invalid_base() {
    let client = AtMyAppClient::with_base_url("k", "not a url").unwrap();
    let err = client
        .endpoint_url(&["collections"], &QueryParams::new())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidUrl(_)));
}

#[test]
fn test_extract_error_message_shapes() {
    assert_eq!(
        extract_error_message(r#"{"error":"Boom"}"#),
        Some("Boom".to_string())
    );
    assert_eq!(
        extract_error_message(r#"{"error":{"message":"Nested"}}"#),
        Some("Nested".to_string())
    );
    assert_eq!(
        extract_error_message(r#"{"message":"Flat"}"#),
        Some("Flat".to_string())
    );
    assert_eq!(
        extract_error_message("plain text"),
        Some("plain text".to_string())
    );
    assert_eq!(extract_error_message("   "), None);
}

mod wiremock_tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Thing {
        id: String,
    }

    #[tokio::test]
    async fn test_get_json_sends_auth_and_cache_headers() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/things/1"))
            .and(header("Authorization", "Bearer test-key"))
            .and(header("Cache-Control", "max-age=60"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "1"})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = AtMyAppClient::with_base_url("test-key", mock_server.uri()).unwrap();
        let thing: Thing = client
            .get_json(&["things", "1"], &QueryParams::new())
            .await
            .unwrap();
        assert_eq!(thing.id, "1");
    }

    #[tokio::test]
    async fn test_priority_mode_sends_no_cache() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/things"))
            .and(header("Cache-Control", "no-cache"))
            .and(query_param("a", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "x"})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = AtMyAppClient::builder("test-key")
            .base_url(mock_server.uri())
            .fetch_mode(FetchMode::Priority)
            .build()
            .unwrap();
        let mut query = QueryParams::new();
        query.set("a", "1");
        let thing: Thing = client.get_json(&["things"], &query).await.unwrap();
        assert_eq!(thing.id, "x");
    }

    #[tokio::test]
    async fn test_get_json_401_is_auth_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(serde_json::json!({"error": "Invalid key"})),
            )
            .mount(&mock_server)
            .await;

        let client = AtMyAppClient::with_base_url("bad", mock_server.uri()).unwrap();
        let err = client
            .get_json::<Thing, _>(&["things"], &QueryParams::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.as_api_error(),
            Some(ApiError::Auth {
                message: "Invalid key".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_get_json_429_reads_retry_after() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
            .mount(&mock_server)
            .await;

        let client = AtMyAppClient::with_base_url("k", mock_server.uri()).unwrap();
        let err = client
            .get_json::<Thing, _>(&["things"], &QueryParams::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.as_api_error(),
            Some(ApiError::RateLimit {
                retry_after: Some(7)
            })
        );
    }

    #[tokio::test]
    async fn test_get_json_500_uses_body_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({"error": {"message": "db down"}})),
            )
            .mount(&mock_server)
            .await;

        let client = AtMyAppClient::with_base_url("k", mock_server.uri()).unwrap();
        let err = client
            .get_json::<Thing, _>(&["things"], &QueryParams::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.as_api_error(),
            Some(ApiError::Http {
                status: 500,
                message: "db down".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_get_json_malformed_body_is_json_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let client = AtMyAppClient::with_base_url("k", mock_server.uri()).unwrap();
        let err = client
            .get_json::<Thing, _>(&["things"], &QueryParams::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Json(_)));
        assert!(matches!(
            err.as_api_error(),
            Some(ApiError::Malformed { .. })
        ));
    }
}
