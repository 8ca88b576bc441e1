//! URL construction for the notifications and configs endpoints.

use crate::core::types::NamespaceCursor;
use crate::error::{Result, ValidationError, WatchError};
use url::Url;

/// Builds request URLs for one app id and cluster on one config service.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
    app_id: String,
    cluster: String,
    client_ip: Option<String>,
}

impl Endpoints {
    /// Create endpoints rooted at `server_url`.
    ///
    /// A trailing `/` is ignored and a path prefix (e.g. behind a gateway) is kept.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the URL does not parse or is not http/https.
    pub fn new(
        server_url: &str,
        app_id: impl Into<String>,
        cluster: impl Into<String>,
    ) -> Result<Self> {
        let base = Url::parse(server_url.trim_end_matches('/')).map_err(|e| {
            ValidationError::invalid_field("server_url", format!("'{}': {}", server_url, e))
        })?;

        if !matches!(base.scheme(), "http" | "https") {
            return Err(ValidationError::invalid_field(
                "server_url",
                format!("unsupported scheme '{}', expected http or https", base.scheme()),
            )
            .into());
        }

        Ok(Self {
            base,
            app_id: app_id.into(),
            cluster: cluster.into(),
            client_ip: None,
        })
    }

    /// Report this client's address to the configs endpoint (`ip` query parameter).
    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    /// `{server}/notifications/v2?appId=..&cluster=..&notifications=[..]`
    pub fn notifications(&self, cursors: &[NamespaceCursor]) -> Result<String> {
        let notifications = serde_json::to_string(cursors).map_err(|e| {
            WatchError::Serialization(format!("Failed to encode notifications: {}", e))
        })?;

        let mut url = self.join(&["notifications", "v2"])?;
        url.query_pairs_mut()
            .append_pair("appId", &self.app_id)
            .append_pair("cluster", &self.cluster)
            .append_pair("notifications", &notifications);
        Ok(url.into())
    }

    /// `{server}/configs/{appId}/{cluster}/{namespace}`
    pub fn configs(&self, namespace: &str) -> Result<String> {
        let mut url = self.join(&["configs", self.app_id.as_str(), self.cluster.as_str(), namespace])?;
        if let Some(ip) = &self.client_ip {
            url.query_pairs_mut().append_pair("ip", ip);
        }
        Ok(url.into())
    }

    fn join(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| WatchError::Other(format!("'{}' cannot be a base URL", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}
