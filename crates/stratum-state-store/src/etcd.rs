//! etcd implementation of StateStore
//!
//! This implementation talks to the etcd v2 keys API over HTTP.

use crate::{normalize_key, StateStore, StoreError, StoreNode, StoreResult};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use std::fmt::Debug;
use std::time::Duration;
use tracing::{debug, error};

/// etcd error code for a missing key
const ETCD_KEY_NOT_FOUND: u64 = 100;

/// Envelope returned by the keys API on success
#[derive(Debug, Deserialize)]
struct EtcdResponse {
    #[allow(dead_code)]
    action: String,
    node: StoreNode,
}

/// Envelope returned by the keys API on failure
#[derive(Debug, Deserialize)]
struct EtcdErrorResponse {
    #[serde(rename = "errorCode")]
    error_code: u64,
    message: String,
    #[serde(default)]
    cause: Option<String>,
}

/// etcd implementation of StateStore
#[derive(Debug, Clone)]
pub struct EtcdStateStore {
    /// Base URL, e.g. `http://127.0.0.1:2379`
    base_url: Url,

    /// Optional user name for basic auth
    user_name: Option<String>,

    /// Optional password for basic auth
    password: Option<String>,

    /// HTTP client
    client: Client,
}

impl EtcdStateStore {
    /// Create a new EtcdStateStore instance
    pub fn new(
        base_url: impl Into<String>,
        user_name: Option<String>,
        password: Option<String>,
        request_timeout: Duration,
    ) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| StoreError::ConfigurationError(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = base_url.into();
        let base_url = Url::parse(&base_url)
            .map_err(|e| StoreError::ConfigurationError(format!("Invalid etcd URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::ConfigurationError(format!("Invalid etcd URL: {}", base_url)));
        }

        Ok(Self {
            base_url,
            user_name,
            password,
            client,
        })
    }

    /// URL under the base URL made of `segments`, each percent-encoded so
    /// that `?`, `#` and `%` stay part of the key
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Keys endpoint URL for a key
    fn key_endpoint(&self, key: &str) -> Url {
        let segments = key.split('/').filter(|segment| !segment.is_empty());
        self.endpoint(["v2", "keys"].into_iter().chain(segments))
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.user_name {
            Some(user) => request.basic_auth(user, self.password.as_ref()),
            None => request,
        }
    }

    fn transport_error(key: &str, err: reqwest::Error) -> StoreError {
        error!(%key, error = %err, "etcd request failed");
        StoreError::Unavailable(format!("etcd request for {} failed: {}", key, err))
    }

    async fn read(&self, key: &str, recursive: bool) -> StoreResult<StoreNode> {
        let key = normalize_key(key);
        debug!(%key, recursive, "Reading from etcd");

        let mut request = self.client.get(self.key_endpoint(&key));
        if recursive {
            request = request.query(&[("recursive", "true")]);
        }

        let response = self
            .with_auth(request)
            .send()
            .await
            .map_err(|e| Self::transport_error(&key, e))?;

        match response.status() {
            StatusCode::OK => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| Self::transport_error(&key, e))?;
                let parsed: EtcdResponse = serde_json::from_slice(&body)?;
                Ok(parsed.node)
            }
            status => Err(Self::failure(&key, status, response.text().await.unwrap_or_default())),
        }
    }

    /// Translate a non-success response into a StoreError
    fn failure(key: &str, status: StatusCode, body: String) -> StoreError {
        if let Ok(etcd_error) = serde_json::from_str::<EtcdErrorResponse>(&body) {
            if etcd_error.error_code == ETCD_KEY_NOT_FOUND {
                return StoreError::KeyNotFound(key.to_string());
            }
            return StoreError::BackendError(anyhow::anyhow!(
                "etcd error {}: {} ({})",
                etcd_error.error_code,
                etcd_error.message,
                etcd_error.cause.unwrap_or_default()
            ));
        }

        if status == StatusCode::NOT_FOUND {
            return StoreError::KeyNotFound(key.to_string());
        }

        error!(%key, %status, "Unexpected etcd response: {}", body);
        if status.is_server_error() {
            StoreError::Unavailable(format!("etcd returned {} for {}", status, key))
        } else {
            StoreError::BackendError(anyhow::anyhow!(
                "Unexpected etcd response: Status {}, Error: {}",
                status,
                body
            ))
        }
    }
}

#[async_trait]
impl StateStore for EtcdStateStore {
    async fn get(&self, key: &str) -> StoreResult<StoreNode> {
        self.read(key, false).await
    }

    async fn get_recursive(&self, key: &str) -> StoreResult<StoreNode> {
        self.read(key, true).await
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let key = normalize_key(key);
        debug!(%key, "Writing to etcd");

        let request = self.client.put(self.key_endpoint(&key)).form(&[("value", value)]);
        let response = self
            .with_auth(request)
            .send()
            .await
            .map_err(|e| Self::transport_error(&key, e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::failure(&key, status, response.text().await.unwrap_or_default()))
        }
    }

    async fn health_check(&self) -> StoreResult<bool> {
        let url = self.endpoint(["health"]);
        let response = self
            .with_auth(self.client.get(url))
            .send()
            .await
            .map_err(|e| Self::transport_error("/health", e))?;

        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_client(mock_server: &MockServer) -> EtcdStateStore {
        EtcdStateStore::new(
            mock_server.uri(),
            Some("root".to_string()),
            Some("secret".to_string()),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_leaf() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/keys/nodes/n1/DetectedCluster/detected_cluster_id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "action": "get",
                "node": {
                    "key": "/nodes/n1/DetectedCluster/detected_cluster_id",
                    "value": "c1",
                    "modifiedIndex": 7,
                    "createdIndex": 7
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let node = client
            .get("/nodes/n1/DetectedCluster/detected_cluster_id")
            .await
            .unwrap();

        assert_eq!(node.value(), Some("c1"));
    }

    #[tokio::test]
    async fn test_get_recursive_sends_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/keys/nodes"))
            .and(query_param("recursive", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "action": "get",
                "node": {
                    "key": "/nodes",
                    "dir": true,
                    "nodes": [{
                        "key": "/nodes/n1",
                        "dir": true,
                        "nodes": [{"key": "/nodes/n1/status", "value": "UP"}]
                    }]
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let node = client.get_recursive("/nodes").await.unwrap();

        assert!(node.is_dir());
        assert_eq!(node.children()[0].children()[0].value(), Some("UP"));
    }

    #[tokio::test]
    async fn test_key_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/keys/clusters"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "errorCode": 100,
                "message": "Key not found",
                "cause": "/clusters",
                "index": 12
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let err = client.get("/clusters").await.unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/keys/nodes"))
            .respond_with(ResponseTemplate::new(503).set_body_string("leader election"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let err = client.get("/nodes").await.unwrap_err();

        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_set_sends_form_value() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/v2/keys/queue/job-1"))
            .and(body_string_contains("value="))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "action": "set",
                "node": {"key": "/queue/job-1", "value": "{}"}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        client.set("/queue/job-1", "{}").await.unwrap();
    }

    #[tokio::test]
    async fn test_reserved_characters_stay_in_the_key() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/keys/indexes/ip/10.0.0.24"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "action": "get",
                "node": {"key": "/indexes/ip/10.0.0.24", "value": "u1"}
            })))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/keys/nodes/u1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "action": "get",
                "node": {"key": "/nodes/u1", "dir": true}
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        assert_eq!(client.get("/indexes/ip/10.0.0.24").await.unwrap().value(), Some("u1"));

        for key in [
            "/indexes/ip/10.0.0.24#bogus",
            "/indexes/ip/10.0.0.24?recursive=true",
            "/nodes/u1?x=1",
            "/nodes/u1%2Fextra",
        ] {
            let err = client.get(key).await.unwrap_err();
            assert!(err.is_not_found(), "{} resolved to an existing key", key);
        }
    }

    #[tokio::test]
    async fn test_key_segments_are_percent_encoded() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/keys/queue/a%3Fb%23c%25d"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "action": "get",
                "node": {"key": "/queue/a?b#c%d", "value": "{}"}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let node = client.get("/queue/a?b#c%d").await.unwrap();

        assert_eq!(node.value(), Some("{}"));
    }

    #[test]
    fn test_invalid_base_url() {
        let err = EtcdStateStore::new("not a url", None, None, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, StoreError::ConfigurationError(_)));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_unavailable() {
        // Nothing listens on port 9 of localhost
        let client = EtcdStateStore::new("http://127.0.0.1:9", None, None, Duration::from_millis(500)).unwrap();
        let err = client.get("/nodes").await.unwrap_err();

        assert!(err.is_transient());
    }
}
