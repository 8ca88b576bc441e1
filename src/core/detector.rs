//! Change detection and per-namespace reconciliation.
//!
//! A cycle asks the notifications endpoint which namespaces moved past the
//! cursors we hold, fetches each reported namespace, publishes the payload and
//! only then advances the namespace's cursor. Failures are isolated per
//! namespace; the only error that aborts a cycle after the notifications
//! answer is a configuration mismatch during the initial load.

use crate::core::cursor::CursorTable;
use crate::core::endpoints::Endpoints;
use crate::core::fetcher::PayloadFetcher;
use crate::core::types::{ChangeNotification, NamespaceCursor};
use crate::error::{Result, WatchError};
use crate::events::EventEmitter;
use crate::metrics::Diagnostics;
use crate::transport::{HttpTransport, STATUS_NOT_MODIFIED, STATUS_OK};
use std::collections::BTreeSet;
use std::sync::Arc;

/// A namespace whose payload could not be fetched in a cycle.
#[derive(Debug)]
pub struct NamespaceFailure {
    /// Namespace name
    pub namespace: String,
    /// Revision that was reported for it
    pub notification_id: i64,
    /// What went wrong
    pub error: WatchError,
}

/// Outcome of one detection cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Status of the notifications response
    pub status: u16,
    /// Namespaces the service reported as changed, in reported order
    pub changed: Vec<ChangeNotification>,
    /// Namespaces fetched and advanced, in processing order
    pub applied: Vec<ChangeNotification>,
    /// Namespaces whose fetch came back without a payload
    pub soft_misses: Vec<ChangeNotification>,
    /// Namespaces whose fetch failed
    pub failures: Vec<NamespaceFailure>,
    /// Whether an initial batch event was published
    pub batch_emitted: bool,
}

impl CycleReport {
    fn unchanged(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// The service answered "nothing changed".
    pub fn is_not_modified(&self) -> bool {
        self.status == STATUS_NOT_MODIFIED
    }

    /// Every reported namespace was applied.
    pub fn is_complete(&self) -> bool {
        self.soft_misses.is_empty() && self.failures.is_empty()
    }
}

/// Detects namespace changes and drives their fetch, cursor advance and emission.
pub struct ChangeDetector {
    transport: Arc<dyn HttpTransport>,
    endpoints: Arc<Endpoints>,
    cursors: CursorTable,
    fetcher: PayloadFetcher,
    emitter: EventEmitter,
    diagnostics: Diagnostics,
}

impl ChangeDetector {
    pub(crate) fn new(
        transport: Arc<dyn HttpTransport>,
        endpoints: Arc<Endpoints>,
        cursors: CursorTable,
        emitter: EventEmitter,
        diagnostics: Diagnostics,
    ) -> Self {
        let fetcher = PayloadFetcher::new(
            Arc::clone(&transport),
            Arc::clone(&endpoints),
            diagnostics.clone(),
        );
        Self {
            transport,
            endpoints,
            cursors,
            fetcher,
            emitter,
            diagnostics,
        }
    }

    /// The cursor table this detector reads and advances.
    pub fn cursors(&self) -> &CursorTable {
        &self.cursors
    }

    /// Run one detection cycle.
    ///
    /// With `is_initial_load`, the service must report exactly the configured
    /// namespaces, and fetched payloads are published as one batch event
    /// instead of individual updates.
    ///
    /// # Errors
    ///
    /// - [`WatchError::Transport`] / [`WatchError::MalformedResponse`] from the
    ///   notifications request; no cursor is touched
    /// - [`WatchError::ConfigurationMismatch`] during the initial load; nothing
    ///   is fetched or emitted
    ///
    /// Per-namespace fetch problems are reported in the [`CycleReport`].
    pub async fn detect_changes(&self, is_initial_load: bool) -> Result<CycleReport> {
        let start = self.diagnostics.cycle_started();
        let result = self.run_cycle(is_initial_load).await;
        self.diagnostics.cycle_finished(start, result.is_ok());
        result
    }

    async fn run_cycle(&self, is_initial_load: bool) -> Result<CycleReport> {
        let cursors = self.cursors.snapshot();

        let response = self.poll_notifications(&cursors).await?;
        let changed = match response {
            Notifications::Changed(changed) => changed,
            Notifications::Unchanged(status) => return Ok(CycleReport::unchanged(status)),
        };

        self.diagnostics.changes_detected(changed.len());
        tracing::info!(
            count = changed.len(),
            initial = is_initial_load,
            "namespaces changed"
        );

        if is_initial_load {
            check_namespaces(&cursors, &changed)?;
        }

        Ok(self.apply(changed, is_initial_load).await)
    }

    async fn poll_notifications(&self, cursors: &[NamespaceCursor]) -> Result<Notifications> {
        let url = self.endpoints.notifications(cursors)?;
        let response = self.transport.request(&url).await?;

        match response.status {
            STATUS_NOT_MODIFIED => {
                self.diagnostics.not_modified();
                tracing::debug!("notifications: not modified");
                Ok(Notifications::Unchanged(response.status))
            }
            STATUS_OK => {
                let changed: Vec<ChangeNotification> = serde_json::from_slice(&response.body)
                    .map_err(|e| WatchError::malformed("notifications", e, &response.body))?;
                Ok(Notifications::Changed(changed))
            }
            status => {
                self.diagnostics.unexpected_status();
                tracing::warn!(
                    status,
                    body = %String::from_utf8_lossy(&response.body),
                    "notifications endpoint returned an unexpected status, treating as no change"
                );
                Ok(Notifications::Unchanged(status))
            }
        }
    }

    async fn apply(&self, changed: Vec<ChangeNotification>, is_initial_load: bool) -> CycleReport {
        let mut report = CycleReport::unchanged(STATUS_OK);
        let mut batch = Vec::new();

        for notification in &changed {
            let namespace = notification.namespace_name.as_str();
            let id = notification.notification_id;

            if self.cursors.get(namespace).is_none() {
                tracing::warn!(namespace, "ignoring change for a namespace that is not watched");
                continue;
            }

            match self.fetcher.fetch_payload(namespace, id).await {
                Ok(Some(payload)) => {
                    self.diagnostics.payload_fetched();
                    // Cursors move only once the payload is published, so a
                    // cancelled cycle re-delivers instead of dropping it.
                    if is_initial_load {
                        batch.push(payload);
                    } else {
                        self.emitter.emit_incremental(payload).await;
                        self.cursors.advance(namespace, id);
                    }
                    report.applied.push(notification.clone());
                }
                Ok(None) => report.soft_misses.push(notification.clone()),
                Err(error) => {
                    self.diagnostics.fetch_failed();
                    tracing::error!(
                        namespace,
                        notification_id = id,
                        error = %error,
                        "failed to fetch namespace payload"
                    );
                    report.failures.push(NamespaceFailure {
                        namespace: namespace.to_string(),
                        notification_id: id,
                        error,
                    });
                }
            }
        }

        if is_initial_load {
            report.batch_emitted = self.emitter.emit_initial_batch(batch).await;
            for applied in &report.applied {
                self.cursors
                    .advance(&applied.namespace_name, applied.notification_id);
            }
        }
        report.changed = changed;
        report
    }
}

enum Notifications {
    Changed(Vec<ChangeNotification>),
    Unchanged(u16),
}

/// The initial answer must name every configured namespace and nothing else.
fn check_namespaces(cursors: &[NamespaceCursor], changed: &[ChangeNotification]) -> Result<()> {
    let expected: BTreeSet<&str> = cursors.iter().map(|c| c.namespace_name.as_str()).collect();
    let received: BTreeSet<&str> = changed.iter().map(|n| n.namespace_name.as_str()).collect();

    if changed.len() != cursors.len() || expected != received {
        let err = WatchError::ConfigurationMismatch {
            expected: cursors.iter().map(|c| c.namespace_name.clone()).collect(),
            received: changed.iter().map(|n| n.namespace_name.clone()).collect(),
        };
        tracing::error!(error = %err, "service does not recognize the configured namespaces");
        return Err(err);
    }
    Ok(())
}
