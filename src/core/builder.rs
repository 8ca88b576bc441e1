//! Builder for constructing ApolloWatcher instances.

use crate::core::cursor::CursorTable;
use crate::core::detector::ChangeDetector;
use crate::core::endpoints::Endpoints;
use crate::core::watcher::ApolloWatcher;
use crate::error::{Result, ValidationError};
use crate::events::{EventBus, EventEmitter};
use crate::metrics::Diagnostics;
use crate::settings::ClientSettings;
use crate::transport::HttpTransport;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "metrics")]
use crate::metrics::PollMetrics;

/// Builder for constructing an `ApolloWatcher`.
///
/// # Examples
///
/// ```rust,no_run
/// use apollo_watch::prelude::*;
///
/// # fn example() -> Result<()> {
/// let subscribers = SubscriberRegistry::new();
///
/// let watcher = ApolloWatcher::builder()
///     .with_server_url("http://config.local:8080")
///     .with_app_id("orders")
///     .with_cluster("prod")
///     .with_namespaces(["application", "db.yaml"])
///     .with_event_bus(subscribers.clone())
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ApolloWatcherBuilder {
    settings: ClientSettings,
    transport: Option<Arc<dyn HttpTransport>>,
    bus: Option<Arc<dyn EventBus>>,
    #[cfg(feature = "metrics")]
    metrics: Option<PollMetrics>,
}

impl ApolloWatcherBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            settings: ClientSettings::new("", ""),
            transport: None,
            bus: None,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Replace every setting with `settings`.
    pub fn with_settings(mut self, settings: ClientSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the config service base URL.
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.settings.server_url = url.into();
        self
    }

    /// Set the application id.
    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.settings.app_id = app_id.into();
        self
    }

    /// Set the cluster name. Default is `default`.
    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.settings.cluster = cluster.into();
        self
    }

    /// Watch one more namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.settings.namespaces.push(namespace.into());
        self
    }

    /// Watch several more namespaces, in order.
    pub fn with_namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings
            .namespaces
            .extend(namespaces.into_iter().map(Into::into));
        self
    }

    /// Report this client's address to the configs endpoint.
    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.settings.client_ip = Some(ip.into());
        self
    }

    /// Set the HTTP request timeout of the default transport.
    ///
    /// Ignored when a custom transport is supplied.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.settings.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the delay between steady-state cycles.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.settings.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the delay after a failed cycle.
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.settings.error_backoff_ms = backoff.as_millis() as u64;
        self
    }

    /// Set how many times the initial load is attempted.
    pub fn with_initial_load_attempts(mut self, attempts: u32) -> Self {
        self.settings.initial_load_attempts = attempts;
        self
    }

    /// Use a custom HTTP transport.
    pub fn with_transport<T: HttpTransport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Publish change events to `bus`.
    pub fn with_event_bus<B: EventBus + 'static>(mut self, bus: B) -> Self {
        self.bus = Some(Arc::new(bus));
        self
    }

    /// Mirror poll diagnostics into OpenTelemetry instruments on `meter`.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, meter: opentelemetry::metrics::Meter) -> Self {
        self.metrics = Some(PollMetrics::new(meter));
        self
    }

    /// Build the watcher.
    ///
    /// No request is made; call [`ApolloWatcher::initial_load`] or
    /// [`ApolloWatcher::start`] next.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The settings fail validation (missing URL, app id or namespaces, duplicates)
    /// - No event bus was supplied
    /// - No transport was supplied and the `http` feature is disabled
    pub fn build(self) -> Result<ApolloWatcher> {
        self.settings.validate()?;

        let bus = self
            .bus
            .ok_or_else(|| ValidationError::custom("an event bus is required"))?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport(&self.settings)?,
        };

        let mut endpoints = Endpoints::new(
            &self.settings.server_url,
            self.settings.app_id.clone(),
            self.settings.cluster.clone(),
        )?;
        if let Some(ip) = &self.settings.client_ip {
            endpoints = endpoints.with_client_ip(ip.clone());
        }

        #[allow(unused_mut)]
        let mut diagnostics = Diagnostics::default();
        #[cfg(feature = "metrics")]
        if let Some(metrics) = self.metrics {
            diagnostics = diagnostics.with_metrics(metrics);
        }

        let cursors = CursorTable::new(self.settings.namespaces.iter().cloned());
        let detector = ChangeDetector::new(
            transport,
            Arc::new(endpoints),
            cursors,
            EventEmitter::new(bus),
            diagnostics.clone(),
        );

        tracing::debug!(
            server_url = %self.settings.server_url,
            app_id = %self.settings.app_id,
            cluster = %self.settings.cluster,
            namespaces = ?self.settings.namespaces,
            "built apollo watcher"
        );

        Ok(ApolloWatcher::new(detector, diagnostics, &self.settings))
    }
}

#[cfg(feature = "http")]
fn default_transport(settings: &ClientSettings) -> Result<Arc<dyn HttpTransport>> {
    let transport = crate::transport::ReqwestTransport::builder()
        .with_timeout(settings.request_timeout())
        .build()?;
    Ok(Arc::new(transport))
}

#[cfg(not(feature = "http"))]
fn default_transport(_settings: &ClientSettings) -> Result<Arc<dyn HttpTransport>> {
    Err(crate::error::WatchError::Other(
        "no transport supplied and the 'http' feature is disabled".to_string(),
    ))
}

impl Default for ApolloWatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WatchError;
    use crate::events::SubscriberRegistry;
    use crate::transport::HttpResponse;
    use async_trait::async_trait;

    struct NoopTransport;

    #[async_trait]
    impl HttpTransport for NoopTransport {
        async fn request(&self, _url: &str) -> Result<HttpResponse> {
            Ok(HttpResponse::new(304, ""))
        }
    }

    fn base() -> ApolloWatcherBuilder {
        ApolloWatcherBuilder::new()
            .with_server_url("http://config.local")
            .with_app_id("demo")
            .with_transport(NoopTransport)
            .with_event_bus(SubscriberRegistry::new())
    }

    #[test]
    fn test_builder_accumulates_namespaces() {
        let builder = base()
            .with_namespace("application")
            .with_namespaces(["db.yaml", "flags"]);
        assert_eq!(
            builder.settings.namespaces,
            vec!["application", "db.yaml", "flags"]
        );
    }

    #[test]
    fn test_builder_durations() {
        let builder = base()
            .with_poll_interval(Duration::from_millis(200))
            .with_error_backoff(Duration::from_secs(2))
            .with_request_timeout(Duration::from_secs(70));
        assert_eq!(builder.settings.poll_interval_ms, 200);
        assert_eq!(builder.settings.error_backoff_ms, 2_000);
        assert_eq!(builder.settings.request_timeout_ms, 70_000);
    }

    #[test]
    fn test_build_ok() {
        let watcher = base().with_namespace("application").build().unwrap();
        assert_eq!(watcher.cursors().len(), 1);
    }

    #[test]
    fn test_build_accepts_uppercase_scheme() {
        let watcher = base()
            .with_server_url("HTTPS://Config.Local")
            .with_namespace("application")
            .build();
        assert!(watcher.is_ok());
    }

    #[test]
    fn test_build_requires_namespaces() {
        let result = base().build();
        assert!(matches!(result, Err(WatchError::Validation(_))));
    }

    #[test]
    fn test_build_requires_bus() {
        let result = ApolloWatcherBuilder::new()
            .with_server_url("http://config.local")
            .with_app_id("demo")
            .with_namespace("application")
            .with_transport(NoopTransport)
            .build();
        assert!(matches!(result, Err(WatchError::Validation(_))));
    }

    #[test]
    fn test_build_with_settings() {
        let mut settings = ClientSettings::new("http://config.local", "demo");
        settings.namespaces = vec!["a".into(), "b".into()];
        settings.cluster = "prod".into();

        let watcher = ApolloWatcherBuilder::new()
            .with_settings(settings)
            .with_transport(NoopTransport)
            .with_event_bus(SubscriberRegistry::new())
            .build()
            .unwrap();
        let names: Vec<_> = watcher
            .cursors()
            .into_iter()
            .map(|c| c.namespace_name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
