//! The watcher handle and its polling loop.

use crate::core::detector::{ChangeDetector, CycleReport};
use crate::core::types::NamespaceCursor;
use crate::error::{Result, WatchError};
use crate::metrics::{Diagnostics, PollStatsSnapshot};
use crate::settings::ClientSettings;
use crate::transport::STATUS_OK;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

/// Watches a set of namespaces on a remote config service.
///
/// The first cycle answered with the namespace list is the initial load: the service must recognize
/// every configured namespace and the fetched payloads are published as one
/// batch. Every later cycle publishes one incremental event per changed
/// namespace.
///
/// # Examples
///
/// ```rust,no_run
/// use apollo_watch::prelude::*;
///
/// # async fn example() -> Result<()> {
/// let subscribers = SubscriberRegistry::new();
/// let _sub = subscribers
///     .subscribe(Topic::IncrementalUpdate, |event: &ChangeEvent| {
///         println!("{} namespace(s) changed", event.payloads().len());
///     })
///     .await;
///
/// let watcher = ApolloWatcher::builder()
///     .with_server_url("http://config.local:8080")
///     .with_app_id("orders")
///     .with_namespaces(["application"])
///     .with_event_bus(subscribers.clone())
///     .build()?;
///
/// // Fails fast if the service does not know a namespace
/// let handle = watcher.start().await?;
///
/// // ... later
/// handle.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct ApolloWatcher {
    detector: ChangeDetector,
    diagnostics: Diagnostics,
    initial_loaded: AtomicBool,
    cycle_lock: Mutex<()>,
    poll_interval: Duration,
    error_backoff: Duration,
    initial_load_attempts: u32,
}

impl ApolloWatcher {
    pub(crate) fn new(
        detector: ChangeDetector,
        diagnostics: Diagnostics,
        settings: &ClientSettings,
    ) -> Self {
        Self {
            detector,
            diagnostics,
            initial_loaded: AtomicBool::new(false),
            cycle_lock: Mutex::new(()),
            poll_interval: settings.poll_interval(),
            error_backoff: settings.error_backoff(),
            initial_load_attempts: settings.initial_load_attempts.max(1),
        }
    }

    /// Create a new builder for constructing a watcher.
    pub fn builder() -> crate::core::ApolloWatcherBuilder {
        crate::core::ApolloWatcherBuilder::new()
    }

    /// Run the initial load, retrying until the service answers with the
    /// namespace list.
    ///
    /// Up to `initial_load_attempts` cycles are tried, `error_backoff` apart.
    /// A cycle that ends without a 200 answer (a 304 or an unexpected status)
    /// is retried like an error; if the attempts run out that way, the last
    /// report is returned and [`is_initial_loaded`](Self::is_initial_loaded)
    /// stays false, so the next [`poll_once`](Self::poll_once) is again an
    /// initial pass.
    ///
    /// # Errors
    ///
    /// - [`WatchError::ConfigurationMismatch`] immediately, without retrying
    /// - the last cycle error once the attempts are exhausted
    /// - [`WatchError::Other`] if the initial load already completed
    pub async fn initial_load(&self) -> Result<CycleReport> {
        if self.is_initial_loaded() {
            return Err(WatchError::Other("initial load already completed".to_string()));
        }

        let mut attempt = 1;
        loop {
            let outcome = self.poll_once().await;
            let retry = match &outcome {
                Ok(_) if self.is_initial_loaded() => false,
                Err(err) if err.is_fatal() => false,
                _ => attempt < self.initial_load_attempts,
            };
            if !retry {
                return outcome;
            }

            match &outcome {
                Ok(report) => tracing::warn!(
                    attempt,
                    max_attempts = self.initial_load_attempts,
                    status = report.status,
                    "initial load got no namespace list, retrying"
                ),
                Err(err) => tracing::warn!(
                    attempt,
                    max_attempts = self.initial_load_attempts,
                    error = %err,
                    "initial load failed, retrying"
                ),
            }
            attempt += 1;
            tokio::time::sleep(self.error_backoff).await;
        }
    }

    /// Run a single cycle.
    ///
    /// Until a cycle has received the namespace list (a 200 answer) this is
    /// the initial load; afterwards it is a steady-state cycle. Concurrent
    /// calls (including the background loop) run one after another.
    pub async fn poll_once(&self) -> Result<CycleReport> {
        let _cycle = self.cycle_lock.lock().await;
        let initial = !self.is_initial_loaded();
        let report = self.detector.detect_changes(initial).await?;
        if initial && report.status == STATUS_OK {
            self.initial_loaded.store(true, Ordering::Release);
            tracing::info!(
                applied = report.applied.len(),
                missing = report.soft_misses.len() + report.failures.len(),
                "initial load complete"
            );
        }
        Ok(report)
    }

    /// Run the initial load (if not done yet) and keep polling in a background task.
    ///
    /// Must be called within a tokio runtime. Dropping the returned handle
    /// stops the loop as well. If the initial load did not complete, the loop
    /// keeps running initial passes and stops on a configuration mismatch.
    ///
    /// # Errors
    ///
    /// Returns the initial-load error; the loop is not started in that case.
    pub async fn start(self) -> Result<PollHandle> {
        if !self.is_initial_loaded() {
            self.initial_load().await?;
        }

        let watcher = Arc::new(self);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let loop_watcher = Arc::clone(&watcher);
        let task = tokio::spawn(async move {
            loop {
                // Dropping an in-flight cycle is safe: cursors only move after a
                // payload was fetched, so unfinished namespaces are re-detected.
                let delay = tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    result = loop_watcher.poll_once() => match result {
                        Ok(_) => loop_watcher.poll_interval,
                        Err(err) if err.is_fatal() => {
                            tracing::error!(error = %err, "stopping poll loop");
                            break;
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "detection cycle failed");
                            loop_watcher.error_backoff
                        }
                    },
                };

                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            tracing::info!("poll loop stopped");
        });

        Ok(PollHandle {
            watcher,
            shutdown: shutdown_tx,
            task,
        })
    }

    /// Whether the initial load has completed.
    pub fn is_initial_loaded(&self) -> bool {
        self.initial_loaded.load(Ordering::Acquire)
    }

    /// Current cursors, in configuration order.
    pub fn cursors(&self) -> Vec<NamespaceCursor> {
        self.detector.cursors().snapshot()
    }

    /// Diagnostic counters.
    pub fn stats(&self) -> PollStatsSnapshot {
        self.diagnostics.stats().snapshot()
    }
}

/// Handle to a running poll loop.
pub struct PollHandle {
    watcher: Arc<ApolloWatcher>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// The watcher driven by the loop.
    pub fn watcher(&self) -> &ApolloWatcher {
        &self.watcher
    }

    /// Whether the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the loop, cancelling any in-flight cycle, and wait for it to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the loop task panicked.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(true);
        self.task
            .await
            .map_err(|e| WatchError::Other(format!("poll loop task failed: {}", e)))
    }
}
