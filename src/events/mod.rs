//! Change events and their delivery.
//!
//! Two kinds of events leave the client: a single startup snapshot carrying
//! every namespace fetched during the initial load, and one live update per
//! namespace change afterwards. They travel on separate topics so subscribers
//! can tell them apart without inspecting flags.

pub mod subscriber;

pub use subscriber::{SubscriberRegistry, SubscriptionHandle};

use crate::core::ConfigPayload;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Topic an event is published on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// One-shot batch produced by the initial load.
    InitialBatch,
    /// Per-namespace update produced by a steady-state cycle.
    IncrementalUpdate,
}

impl Topic {
    /// Wire name of the topic.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::InitialBatch => "initial-batch",
            Topic::IncrementalUpdate => "incremental-update",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// Every payload fetched during the initial load, in fetch order.
    InitialBatch(Vec<ConfigPayload>),
    /// A single namespace changed.
    Incremental(ConfigPayload),
}

impl ChangeEvent {
    /// Topic this event belongs on.
    pub fn topic(&self) -> Topic {
        match self {
            ChangeEvent::InitialBatch(_) => Topic::InitialBatch,
            ChangeEvent::Incremental(_) => Topic::IncrementalUpdate,
        }
    }

    /// Payloads carried by the event.
    pub fn payloads(&self) -> &[ConfigPayload] {
        match self {
            ChangeEvent::InitialBatch(payloads) => payloads,
            ChangeEvent::Incremental(payload) => std::slice::from_ref(payload),
        }
    }
}

/// Destination for change events.
///
/// Publishing cannot fail from the client's point of view: delivery problems
/// are the bus's to report, and never interrupt polling.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event on its topic.
    async fn publish(&self, event: ChangeEvent);
}

#[async_trait]
impl EventBus for mpsc::UnboundedSender<ChangeEvent> {
    async fn publish(&self, event: ChangeEvent) {
        let topic = event.topic();
        if self.send(event).is_err() {
            tracing::warn!(%topic, "event receiver dropped, discarding change event");
        }
    }
}

/// Hands fetched payloads to the event bus as the right kind of event.
#[derive(Clone)]
pub struct EventEmitter {
    bus: Arc<dyn EventBus>,
}

impl EventEmitter {
    /// Create an emitter publishing to `bus`.
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self { bus }
    }

    /// Publish a live update for one namespace.
    pub async fn emit_incremental(&self, payload: ConfigPayload) {
        tracing::debug!(namespace = %payload.namespace_name, "emitting incremental update");
        self.bus.publish(ChangeEvent::Incremental(payload)).await;
    }

    /// Publish the startup snapshot. An empty batch is not published.
    ///
    /// Returns whether an event was published.
    pub async fn emit_initial_batch(&self, payloads: Vec<ConfigPayload>) -> bool {
        if payloads.is_empty() {
            return false;
        }
        tracing::debug!(count = payloads.len(), "emitting initial batch");
        self.bus.publish(ChangeEvent::InitialBatch(payloads)).await;
        true
    }
}
