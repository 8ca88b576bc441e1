//! HTTP transport abstraction.
//!
//! The detector and fetcher only need "GET this URL, give me the status and
//! body". Connection pooling, TLS and timeouts belong to the implementation.

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::{HttpAuth, ReqwestTransport, ReqwestTransportBuilder};

use crate::error::Result;
use async_trait::async_trait;

/// Status code of a successful response.
pub const STATUS_OK: u16 = 200;

/// Status code the notifications endpoint uses for "nothing changed".
pub const STATUS_NOT_MODIFIED: u16 = 304;

/// A fully read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Trait for issuing GET requests against the config service.
///
/// Implementations must return `Ok` for every response that arrived, whatever
/// its status, and reserve `Err(WatchError::Transport(..))` for failures to get
/// a response at all.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a GET request and read the whole body.
    async fn request(&self, url: &str) -> Result<HttpResponse>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for std::sync::Arc<T> {
    async fn request(&self, url: &str) -> Result<HttpResponse> {
        (**self).request(url).await
    }
}
