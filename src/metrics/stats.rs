//! Always-on diagnostic counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing what polling cycles have observed.
///
/// These exist so that quiet outcomes (a 304, an unexpected status code, a
/// fetch that produced nothing) stay visible without turning them into errors.
#[derive(Debug, Default)]
pub struct PollStats {
    cycles: AtomicU64,
    cycle_errors: AtomicU64,
    not_modified: AtomicU64,
    unexpected_status: AtomicU64,
    changes_detected: AtomicU64,
    payloads_fetched: AtomicU64,
    soft_misses: AtomicU64,
    fetch_failures: AtomicU64,
}

/// Point-in-time copy of [`PollStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStatsSnapshot {
    /// Detection cycles started
    pub cycles: u64,
    /// Cycles that ended with a cycle-level error
    pub cycle_errors: u64,
    /// 304 answers from the notifications endpoint
    pub not_modified: u64,
    /// Notifications answers that were neither 200 nor 304
    pub unexpected_status: u64,
    /// Namespaces reported as changed
    pub changes_detected: u64,
    /// Payloads fetched successfully
    pub payloads_fetched: u64,
    /// Payload fetches answered with a non-200 status
    pub soft_misses: u64,
    /// Payload fetches that failed (transport or malformed body)
    pub fetch_failures: u64,
}

impl PollStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the current values.
    pub fn snapshot(&self) -> PollStatsSnapshot {
        PollStatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            cycle_errors: self.cycle_errors.load(Ordering::Relaxed),
            not_modified: self.not_modified.load(Ordering::Relaxed),
            unexpected_status: self.unexpected_status.load(Ordering::Relaxed),
            changes_detected: self.changes_detected.load(Ordering::Relaxed),
            payloads_fetched: self.payloads_fetched.load(Ordering::Relaxed),
            soft_misses: self.soft_misses.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cycle_error(&self) {
        self.cycle_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_not_modified(&self) {
        self.not_modified.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unexpected_status(&self) {
        self.unexpected_status.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_changes(&self, count: u64) {
        self.changes_detected.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_payload(&self) {
        self.payloads_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_soft_miss(&self) {
        self.soft_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = PollStats::new();
        stats.record_cycle();
        stats.record_cycle();
        stats.record_not_modified();
        stats.record_changes(3);
        stats.record_payload();
        stats.record_soft_miss();
        stats.record_fetch_failure();
        stats.record_unexpected_status();
        stats.record_cycle_error();

        assert_eq!(
            stats.snapshot(),
            PollStatsSnapshot {
                cycles: 2,
                cycle_errors: 1,
                not_modified: 1,
                unexpected_status: 1,
                changes_detected: 3,
                payloads_fetched: 1,
                soft_misses: 1,
                fetch_failures: 1,
            }
        );
    }
}
