//! Polling metrics using OpenTelemetry.

use opentelemetry::metrics::{Counter, Histogram, Meter};
use std::time::Instant;

/// OpenTelemetry instruments for the polling loop.
///
/// # Examples
///
/// ```rust,no_run
/// use apollo_watch::metrics::PollMetrics;
/// use opentelemetry::global;
///
/// let metrics = PollMetrics::new(global::meter("apollo-watch"));
///
/// let timer = metrics.start_cycle();
/// // ... run a detection cycle ...
/// metrics.record_cycle_success(timer);
/// ```
#[derive(Clone)]
pub struct PollMetrics {
    cycles: Counter<u64>,
    cycle_failures: Counter<u64>,
    cycle_duration: Histogram<f64>,
    not_modified: Counter<u64>,
    unexpected_status: Counter<u64>,
    changes_detected: Counter<u64>,
    payloads_fetched: Counter<u64>,
    soft_misses: Counter<u64>,
    fetch_failures: Counter<u64>,
}

impl PollMetrics {
    /// Create the instruments on `meter`.
    pub fn new(meter: Meter) -> Self {
        let cycles = meter
            .u64_counter("apollo_watch.cycle.attempts")
            .with_description("Total number of detection cycles")
            .build();

        let cycle_failures = meter
            .u64_counter("apollo_watch.cycle.failures")
            .with_description("Detection cycles that ended with an error")
            .build();

        let cycle_duration = meter
            .f64_histogram("apollo_watch.cycle.duration")
            .with_description("Duration of detection cycles in seconds")
            .with_unit("s")
            .build();

        let not_modified = meter
            .u64_counter("apollo_watch.notifications.not_modified")
            .with_description("304 answers from the notifications endpoint")
            .build();

        let unexpected_status = meter
            .u64_counter("apollo_watch.notifications.unexpected_status")
            .with_description("Notifications answers that were neither 200 nor 304")
            .build();

        let changes_detected = meter
            .u64_counter("apollo_watch.notifications.changes")
            .with_description("Namespaces reported as changed")
            .build();

        let payloads_fetched = meter
            .u64_counter("apollo_watch.fetch.success")
            .with_description("Payloads fetched successfully")
            .build();

        let soft_misses = meter
            .u64_counter("apollo_watch.fetch.soft_miss")
            .with_description("Payload fetches answered with a non-200 status")
            .build();

        let fetch_failures = meter
            .u64_counter("apollo_watch.fetch.failures")
            .with_description("Payload fetches that failed")
            .build();

        Self {
            cycles,
            cycle_failures,
            cycle_duration,
            not_modified,
            unexpected_status,
            changes_detected,
            payloads_fetched,
            soft_misses,
            fetch_failures,
        }
    }

    /// Start a cycle timer.
    pub fn start_cycle(&self) -> Instant {
        self.cycles.add(1, &[]);
        Instant::now()
    }

    /// Record a cycle that completed.
    pub fn record_cycle_success(&self, start: Instant) {
        self.cycle_duration.record(start.elapsed().as_secs_f64(), &[]);
    }

    /// Record a cycle that ended with an error.
    pub fn record_cycle_failure(&self, start: Instant) {
        self.cycle_failures.add(1, &[]);
        self.cycle_duration.record(start.elapsed().as_secs_f64(), &[]);
    }

    pub(crate) fn record_not_modified(&self) {
        self.not_modified.add(1, &[]);
    }

    pub(crate) fn record_unexpected_status(&self) {
        self.unexpected_status.add(1, &[]);
    }

    pub(crate) fn record_changes(&self, count: u64) {
        self.changes_detected.add(count, &[]);
    }

    pub(crate) fn record_payload(&self) {
        self.payloads_fetched.add(1, &[]);
    }

    pub(crate) fn record_soft_miss(&self) {
        self.soft_misses.add(1, &[]);
    }

    pub(crate) fn record_fetch_failure(&self) {
        self.fetch_failures.add(1, &[]);
    }
}
