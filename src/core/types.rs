//! Wire and pipeline data types.

use serde::{Deserialize, Serialize};

/// Notification id assigned to every namespace before anything has been observed.
///
/// The service answers a cursor of `-1` with the namespace's current id, which is
/// how the initial load learns about every configured namespace.
pub const INITIAL_NOTIFICATION_ID: i64 = -1;

/// A namespace and the last revision observed for it.
///
/// Serializes as `{"namespaceName": ..., "notificationId": ...}`, the shape the
/// notifications endpoint expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceCursor {
    /// Namespace name
    pub namespace_name: String,
    /// Last observed notification id
    pub notification_id: i64,
}

impl NamespaceCursor {
    /// Create a cursor at [`INITIAL_NOTIFICATION_ID`].
    pub fn initial(namespace_name: impl Into<String>) -> Self {
        Self {
            namespace_name: namespace_name.into(),
            notification_id: INITIAL_NOTIFICATION_ID,
        }
    }
}

/// The service's report that a namespace is now at a given revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeNotification {
    /// Namespace name
    pub namespace_name: String,
    /// Revision the namespace has advanced to
    pub notification_id: i64,
}

/// Raw configuration content for one namespace.
///
/// The bytes are the compact JSON re-serialization of the service's
/// `configurations` field. Interpreting them is up to the subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPayload {
    /// Namespace the content belongs to
    pub namespace_name: String,
    /// Serialized configuration content
    pub bytes: Vec<u8>,
}

impl ConfigPayload {
    /// Create a payload.
    pub fn new(namespace_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            namespace_name: namespace_name.into(),
            bytes,
        }
    }
}
