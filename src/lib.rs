//! # apollo-watch
//!
//! Change notification client for Apollo-style remote configuration services.
//!
//! ## Overview
//!
//! The client keeps one revision cursor per watched namespace and repeatedly
//! asks the service which namespaces moved past those cursors. Every namespace
//! reported as changed is fetched in full and published as a raw payload:
//! - the initial load publishes a single batch on the
//!   `initial-batch` topic and fails fast if the service does not know a
//!   configured namespace
//! - every later cycle publishes one event per namespace on `incremental-update`
//!
//! A cursor only advances after its payload was fetched, so an interrupted
//! cycle re-detects whatever it did not finish (at-least-once delivery).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use apollo_watch::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let subscribers = SubscriberRegistry::new();
//! let _startup = subscribers
//!     .subscribe(Topic::InitialBatch, |event: &ChangeEvent| {
//!         for payload in event.payloads() {
//!             println!("loaded {}", payload.namespace_name);
//!         }
//!     })
//!     .await;
//!
//! let handle = ApolloWatcher::builder()
//!     .with_server_url("http://config.local:8080")
//!     .with_app_id("orders")
//!     .with_namespaces(["application", "db.yaml"])
//!     .with_event_bus(subscribers.clone())
//!     .build()?
//!     .start()
//!     .await?;
//!
//! handle.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `http` (default): reqwest-backed [`transport::ReqwestTransport`]
//! - `metrics`: OpenTelemetry instruments via [`metrics::PollMetrics`]

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod events;
pub mod metrics;
pub mod settings;
pub mod transport;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{
        ApolloWatcher, ApolloWatcherBuilder, ConfigPayload, CycleReport, PollHandle,
    };
    pub use crate::error::{Result, ValidationError, WatchError};
    pub use crate::events::{ChangeEvent, EventBus, SubscriberRegistry, Topic};
    pub use crate::settings::ClientSettings;
}
