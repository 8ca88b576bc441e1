//! Callback subscribers keyed by topic.

use super::{ChangeEvent, EventBus, Topic};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

type Callback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Handle for a subscription that can be dropped to unsubscribe.
///
/// When the handle is dropped the callback stops firing at once; the entry
/// itself is removed as soon as the registry lock is free.
pub struct SubscriptionHandle {
    id: usize,
    active: Arc<AtomicBool>,
    registry: Arc<RwLock<SubscriberRegistryInner>>,
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);

        let id = self.id;
        if let Ok(mut inner) = self.registry.try_write() {
            inner.remove(id);
            return;
        }

        // Lock is busy (a publish is in flight); finish the removal later.
        let registry = Arc::clone(&self.registry);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    registry.write().await.remove(id);
                });
            }
            Err(_) => {
                tracing::warn!(
                    subscription = id,
                    "registry busy outside a runtime, subscription removed on next subscribe"
                );
            }
        }
    }
}

struct Subscriber {
    id: usize,
    topic: Option<Topic>,
    callback: Callback,
    active: Arc<AtomicBool>,
}

impl Subscriber {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Internal subscriber registry state.
struct SubscriberRegistryInner {
    subscribers: Vec<Subscriber>,
    next_id: usize,
}

impl SubscriberRegistryInner {
    fn remove(&mut self, id: usize) {
        self.subscribers.retain(|s| s.id != id);
    }
}

/// Registry of change-event callbacks.
///
/// Callbacks are registered for one topic or for all of them and are invoked in
/// subscription order. The registry is itself an [`EventBus`], so it can be
/// handed straight to the watcher.
///
/// # Examples
///
/// ```rust,no_run
/// use apollo_watch::events::{ChangeEvent, SubscriberRegistry, Topic};
///
/// # async fn example() {
/// let registry = SubscriberRegistry::new();
///
/// let handle = registry
///     .subscribe(Topic::IncrementalUpdate, |event: &ChangeEvent| {
///         for payload in event.payloads() {
///             println!("{} changed", payload.namespace_name);
///         }
///     })
///     .await;
///
/// // Unsubscribe by dropping the handle
/// drop(handle);
/// # }
/// ```
pub struct SubscriberRegistry {
    inner: Arc<RwLock<SubscriberRegistryInner>>,
}

impl SubscriberRegistry {
    /// Create a new subscriber registry.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(SubscriberRegistryInner {
                subscribers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Subscribe to events on one topic.
    pub async fn subscribe<F>(&self, topic: Topic, callback: F) -> SubscriptionHandle
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.insert(Some(topic), Arc::new(callback)).await
    }

    /// Subscribe to events on every topic.
    pub async fn subscribe_all<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.insert(None, Arc::new(callback)).await
    }

    async fn insert(&self, topic: Option<Topic>, callback: Callback) -> SubscriptionHandle {
        let mut inner = self.inner.write().await;
        inner.subscribers.retain(Subscriber::is_active);

        let id = inner.next_id;
        inner.next_id += 1;
        let active = Arc::new(AtomicBool::new(true));
        inner.subscribers.push(Subscriber {
            id,
            topic,
            callback,
            active: Arc::clone(&active),
        });

        SubscriptionHandle {
            id,
            active,
            registry: Arc::clone(&self.inner),
        }
    }

    /// Deliver an event to every subscriber of its topic.
    pub async fn notify(&self, event: &ChangeEvent) {
        let topic = event.topic();
        let inner = self.inner.read().await;
        for subscriber in &inner.subscribers {
            if subscriber.is_active() && subscriber.topic.is_none_or(|t| t == topic) {
                (subscriber.callback)(event);
            }
        }
    }

    /// Get the number of active subscribers.
    pub async fn subscriber_count(&self) -> usize {
        let inner = self.inner.read().await;
        inner.subscribers.iter().filter(|s| s.is_active()).count()
    }
}

#[async_trait]
impl EventBus for SubscriberRegistry {
    async fn publish(&self, event: ChangeEvent) {
        self.notify(&event).await;
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SubscriberRegistry {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
