//! Observability for the polling loop.
//!
//! [`PollStats`] counters are always collected. With the `metrics` feature,
//! [`PollMetrics`] mirrors them into OpenTelemetry instruments:
//!
//! ```rust,no_run
//! # #[cfg(feature = "metrics")]
//! # fn example() -> apollo_watch::error::Result<()> {
//! use apollo_watch::prelude::*;
//! use opentelemetry::global;
//!
//! let watcher = ApolloWatcher::builder()
//!     .with_server_url("http://localhost:8080")
//!     .with_app_id("demo")
//!     .with_namespaces(["application"])
//!     .with_event_bus(SubscriberRegistry::new())
//!     .with_metrics(global::meter("my-app"))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

mod stats;

#[cfg(feature = "metrics")]
mod poll_metrics;

pub use stats::{PollStats, PollStatsSnapshot};

#[cfg(feature = "metrics")]
pub use poll_metrics::PollMetrics;

use std::sync::Arc;
use std::time::Instant;

/// Fan-out of every diagnostic event to the counters and, when enabled, the
/// OpenTelemetry instruments.
#[derive(Clone, Default)]
pub(crate) struct Diagnostics {
    stats: Arc<PollStats>,
    #[cfg(feature = "metrics")]
    metrics: Option<PollMetrics>,
}

impl Diagnostics {
    #[cfg(feature = "metrics")]
    pub(crate) fn with_metrics(mut self, metrics: PollMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub(crate) fn stats(&self) -> &Arc<PollStats> {
        &self.stats
    }

    pub(crate) fn cycle_started(&self) -> Instant {
        self.stats.record_cycle();
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            return metrics.start_cycle();
        }
        Instant::now()
    }

    pub(crate) fn cycle_finished(&self, start: Instant, ok: bool) {
        if !ok {
            self.stats.record_cycle_error();
        }
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            if ok {
                metrics.record_cycle_success(start);
            } else {
                metrics.record_cycle_failure(start);
            }
        }
        #[cfg(not(feature = "metrics"))]
        let _ = start;
    }

    pub(crate) fn not_modified(&self) {
        self.stats.record_not_modified();
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_not_modified();
        }
    }

    pub(crate) fn unexpected_status(&self) {
        self.stats.record_unexpected_status();
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_unexpected_status();
        }
    }

    pub(crate) fn changes_detected(&self, count: usize) {
        self.stats.record_changes(count as u64);
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_changes(count as u64);
        }
    }

    pub(crate) fn payload_fetched(&self) {
        self.stats.record_payload();
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_payload();
        }
    }

    pub(crate) fn soft_miss(&self) {
        self.stats.record_soft_miss();
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_soft_miss();
        }
    }

    pub(crate) fn fetch_failed(&self) {
        self.stats.record_fetch_failure();
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_fetch_failure();
        }
    }
}
