//! Per-namespace revision cursors shared between polling cycles.

use crate::core::types::NamespaceCursor;
use parking_lot::Mutex;
use std::sync::Arc;

/// Thread-safe table of namespace revision cursors.
///
/// The set of namespaces is fixed at construction. Every access takes the lock
/// for a single snapshot or a single-entry write only, so the lock is never held
/// across a network call. Cloning shares the same table.
///
/// # Examples
///
/// ```rust
/// use apollo_watch::core::CursorTable;
///
/// let table = CursorTable::new(["application", "db.yaml"]);
/// assert!(table.advance("application", 3));
///
/// let snapshot = table.snapshot();
/// assert_eq!(snapshot[0].notification_id, 3);
/// assert_eq!(snapshot[1].notification_id, -1);
/// ```
#[derive(Clone)]
pub struct CursorTable {
    cursors: Arc<Mutex<Vec<NamespaceCursor>>>,
}

impl CursorTable {
    /// Create a table with every namespace at the initial notification id.
    ///
    /// Duplicate names are collapsed; the first occurrence keeps its position.
    pub fn new<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut cursors: Vec<NamespaceCursor> = Vec::new();
        for name in namespaces {
            let name = name.into();
            if !cursors.iter().any(|c| c.namespace_name == name) {
                cursors.push(NamespaceCursor::initial(name));
            }
        }

        Self {
            cursors: Arc::new(Mutex::new(cursors)),
        }
    }

    /// Copy every cursor, in configuration order.
    pub fn snapshot(&self) -> Vec<NamespaceCursor> {
        self.cursors.lock().clone()
    }

    /// Record that `namespace` has been processed at `notification_id`.
    ///
    /// Cursors only move forward: an id not greater than the stored one is
    /// ignored. Returns whether the cursor moved; `false` also covers
    /// namespaces outside the table, whose set never grows after construction.
    pub fn advance(&self, namespace: &str, notification_id: i64) -> bool {
        let mut cursors = self.cursors.lock();
        match cursors.iter_mut().find(|c| c.namespace_name == namespace) {
            Some(cursor) if notification_id > cursor.notification_id => {
                cursor.notification_id = notification_id;
                true
            }
            Some(cursor) => {
                tracing::debug!(
                    namespace,
                    current = cursor.notification_id,
                    reported = notification_id,
                    "ignoring stale cursor advance"
                );
                false
            }
            None => false,
        }
    }

    /// Current notification id of a namespace.
    pub fn get(&self, namespace: &str) -> Option<i64> {
        self.cursors
            .lock()
            .iter()
            .find(|c| c.namespace_name == namespace)
            .map(|c| c.notification_id)
    }

    /// Configured namespace names, in configuration order.
    pub fn namespaces(&self) -> Vec<String> {
        self.cursors
            .lock()
            .iter()
            .map(|c| c.namespace_name.clone())
            .collect()
    }

    /// Number of configured namespaces.
    pub fn len(&self) -> usize {
        self.cursors.lock().len()
    }

    /// Whether no namespaces are configured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
