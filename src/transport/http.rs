//! reqwest-backed transport.

use super::{HttpResponse, HttpTransport};
use crate::error::{Result, WatchError};
use async_trait::async_trait;
use reqwest::{Client, header::HeaderValue};
use std::time::Duration;

/// Default request timeout.
///
/// The notifications endpoint holds a request for up to 60 seconds before
/// answering 304, so the timeout has to be comfortably longer than that.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

/// Authentication method for HTTP requests.
#[derive(Clone)]
pub enum HttpAuth {
    /// No authentication
    None,
    /// Bearer token authentication
    Bearer(String),
    /// Basic authentication (username, password)
    Basic(String, String),
}

/// HTTP transport built on a shared `reqwest::Client`.
///
/// Status codes are passed through untouched; only failures to obtain a
/// response become errors.
///
/// # Examples
///
/// ```rust,no_run
/// use apollo_watch::transport::ReqwestTransport;
/// use std::time::Duration;
///
/// # fn example() -> apollo_watch::error::Result<()> {
/// let transport = ReqwestTransport::builder()
///     .with_timeout(Duration::from_secs(90))
///     .with_auth_token("secret-token")
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ReqwestTransport {
    client: Client,
    auth: HttpAuth,
}

impl ReqwestTransport {
    /// Create a new builder for constructing a transport.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn request(&self, url: &str) -> Result<HttpResponse> {
        let mut request = self.client.get(url);

        request = match &self.auth {
            HttpAuth::None => request,
            HttpAuth::Bearer(token) => {
                let header_value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| WatchError::Transport(format!("Invalid bearer token: {}", e)))?;
                request.header("Authorization", header_value)
            }
            HttpAuth::Basic(username, password) => request.basic_auth(username, Some(password)),
        };

        let response = request
            .send()
            .await
            .map_err(|e| WatchError::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| WatchError::Transport(format!("Failed to read response body: {}", e)))?;

        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

/// Builder for constructing a `ReqwestTransport`.
pub struct ReqwestTransportBuilder {
    auth: HttpAuth,
    timeout: Duration,
}

impl ReqwestTransportBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            auth: HttpAuth::None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set Bearer token authentication.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth = HttpAuth::Bearer(token.into());
        self
    }

    /// Set Basic authentication.
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.auth = HttpAuth::Basic(username.into(), password.into());
        self
    }

    /// Set the request timeout.
    ///
    /// Default is 90 seconds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn build(self) -> Result<ReqwestTransport> {
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| WatchError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(ReqwestTransport {
            client,
            auth: self.auth,
        })
    }
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = ReqwestTransport::builder();
        assert_eq!(builder.timeout, DEFAULT_TIMEOUT);
        assert!(matches!(builder.auth, HttpAuth::None));
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_builder_with_auth() {
        let builder = ReqwestTransport::builder()
            .with_auth_token("token123")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(builder.timeout, Duration::from_secs(5));
        assert!(matches!(builder.auth, HttpAuth::Bearer(ref t) if t == "token123"));
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_builder_with_basic_auth() {
        let transport = ReqwestTransport::builder()
            .with_basic_auth("user", "pass")
            .build();

        assert!(transport.is_ok());
    }
}
