//! Fetches the uncached configuration content of a single namespace.

use crate::core::endpoints::Endpoints;
use crate::core::types::ConfigPayload;
use crate::error::{Result, WatchError};
use crate::metrics::Diagnostics;
use crate::transport::{HttpTransport, STATUS_OK};
use serde::Deserialize;
use std::sync::Arc;

/// Body of the configs endpoint.
///
/// Only `configurations` is used; the remaining fields are kept for logging.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigsResponse {
    #[serde(default)]
    app_id: Option<String>,
    #[serde(default)]
    cluster: Option<String>,
    #[serde(default)]
    namespace_name: Option<String>,
    #[serde(default)]
    configurations: serde_json::Value,
    #[serde(default)]
    release_key: Option<String>,
}

/// Fetches namespace payloads from the configs endpoint.
#[derive(Clone)]
pub struct PayloadFetcher {
    transport: Arc<dyn HttpTransport>,
    endpoints: Arc<Endpoints>,
    diagnostics: Diagnostics,
}

impl PayloadFetcher {
    pub(crate) fn new(
        transport: Arc<dyn HttpTransport>,
        endpoints: Arc<Endpoints>,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            transport,
            endpoints,
            diagnostics,
        }
    }

    /// Fetch the current content of `namespace`.
    ///
    /// Returns `Ok(None)` when the service answers with anything other than
    /// 200: that is a soft miss, counted and logged but not an error.
    ///
    /// # Errors
    ///
    /// - [`WatchError::Transport`] if no response was received
    /// - [`WatchError::MalformedResponse`] if a 200 body is not a configs object
    pub async fn fetch_payload(
        &self,
        namespace: &str,
        notification_id: i64,
    ) -> Result<Option<ConfigPayload>> {
        let url = self.endpoints.configs(namespace)?;
        let response = self.transport.request(&url).await?;

        if response.status != STATUS_OK {
            self.diagnostics.soft_miss();
            tracing::warn!(
                namespace,
                notification_id,
                status = response.status,
                "configs endpoint returned no payload"
            );
            return Ok(None);
        }

        let parsed: ConfigsResponse = serde_json::from_slice(&response.body)
            .map_err(|e| WatchError::malformed("configs", e, &response.body))?;

        let bytes = serde_json::to_vec(&parsed.configurations).map_err(|e| {
            WatchError::Serialization(format!(
                "Failed to re-serialize configurations of '{}': {}",
                namespace, e
            ))
        })?;

        tracing::debug!(
            namespace,
            notification_id,
            release_key = parsed.release_key.as_deref().unwrap_or_default(),
            app_id = parsed.app_id.as_deref().unwrap_or_default(),
            cluster = parsed.cluster.as_deref().unwrap_or_default(),
            reported_namespace = parsed.namespace_name.as_deref().unwrap_or_default(),
            size = bytes.len(),
            "fetched namespace payload"
        );

        Ok(Some(ConfigPayload::new(namespace, bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::HttpResponse;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct FixedTransport {
        response: Result<HttpResponse>,
        requested: Mutex<Vec<String>>,
    }

    impl FixedTransport {
        fn new(response: Result<HttpResponse>) -> Arc<Self> {
            Arc::new(Self {
                response,
                requested: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl HttpTransport for FixedTransport {
        async fn request(&self, url: &str) -> Result<HttpResponse> {
            self.requested.lock().push(url.to_string());
            match &self.response {
                Ok(response) => Ok(response.clone()),
                Err(e) => Err(WatchError::Transport(e.to_string())),
            }
        }
    }

    fn fetcher(transport: Arc<FixedTransport>) -> (PayloadFetcher, Diagnostics) {
        let endpoints = Endpoints::new("http://config.local", "demo", "default").unwrap();
        let diagnostics = Diagnostics::default();
        let fetcher = PayloadFetcher::new(transport, Arc::new(endpoints), diagnostics.clone());
        (fetcher, diagnostics)
    }

    #[tokio::test]
    async fn test_success_reserializes_configurations() {
        let body = r#"{"appId":"demo","cluster":"default","namespaceName":"application",
            "configurations":{"timeout":"100","db.url":"jdbc:x"},"releaseKey":"20240101-abc"}"#;
        let transport = FixedTransport::new(Ok(HttpResponse::new(200, body)));
        let (fetcher, _) = fetcher(Arc::clone(&transport));

        let payload = fetcher.fetch_payload("application", 5).await.unwrap().unwrap();
        assert_eq!(payload.namespace_name, "application");
        assert_eq!(payload.bytes, br#"{"db.url":"jdbc:x","timeout":"100"}"#.to_vec());
        assert_eq!(
            transport.requested.lock().as_slice(),
            ["http://config.local/configs/demo/default/application"]
        );
    }

    #[tokio::test]
    async fn test_missing_configurations_is_null() {
        let transport = FixedTransport::new(Ok(HttpResponse::new(200, r#"{"appId":"demo"}"#)));
        let (fetcher, _) = fetcher(transport);

        let payload = fetcher.fetch_payload("application", 1).await.unwrap().unwrap();
        assert_eq!(payload.bytes, b"null".to_vec());
    }

    #[tokio::test]
    async fn test_non_ok_status_is_soft_miss() {
        for status in [304u16, 404, 500] {
            let transport = FixedTransport::new(Ok(HttpResponse::new(status, "")));
            let (fetcher, diagnostics) = fetcher(transport);

            let result = fetcher.fetch_payload("application", 1).await;
            assert!(matches!(result, Ok(None)), "status {}", status);
            assert_eq!(diagnostics.stats().snapshot().soft_misses, 1);
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_error() {
        let transport = FixedTransport::new(Ok(HttpResponse::new(200, "[1,2,3]")));
        let (fetcher, _) = fetcher(transport);

        let err = fetcher.fetch_payload("application", 1).await.unwrap_err();
        match err {
            WatchError::MalformedResponse { endpoint, body, .. } => {
                assert_eq!(endpoint, "configs");
                assert_eq!(body, "[1,2,3]");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let transport = FixedTransport::new(Err(WatchError::Transport("timed out".into())));
        let (fetcher, diagnostics) = fetcher(transport);

        let err = fetcher.fetch_payload("application", 1).await.unwrap_err();
        assert!(matches!(err, WatchError::Transport(_)));
        assert_eq!(diagnostics.stats().snapshot().soft_misses, 0);
    }
}
