//! Revision reconciliation: cursors, change detection, payload fetching.

mod builder;
mod cursor;
mod detector;
mod endpoints;
mod fetcher;
mod types;
mod watcher;

pub use builder::ApolloWatcherBuilder;
pub use cursor::CursorTable;
pub use detector::{ChangeDetector, CycleReport, NamespaceFailure};
pub use endpoints::Endpoints;
pub use fetcher::PayloadFetcher;
pub use types::{ChangeNotification, ConfigPayload, INITIAL_NOTIFICATION_ID, NamespaceCursor};
pub use watcher::{ApolloWatcher, PollHandle};
