//! Shared test doubles for the integration tests.

#![allow(dead_code)]

use apollo_watch::core::{ChangeNotification, NamespaceCursor};
use apollo_watch::error::{Result, WatchError};
use apollo_watch::events::{ChangeEvent, EventBus};
use apollo_watch::transport::{HttpResponse, HttpTransport};
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use url::Url;

pub const SERVER: &str = "http://config.test:8080";

/// A scripted answer to one request.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, String),
    TransportError(String),
    /// Never answers; models a request cut off by cancellation.
    Hang,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Reply::Status(200, body.into())
    }

    pub fn not_modified() -> Self {
        Reply::Status(304, String::new())
    }
}

/// Transport answering from per-endpoint queues.
///
/// Once a queue is empty the notifications endpoint answers 304 and the
/// configs endpoint answers 404.
#[derive(Default)]
pub struct ScriptedTransport {
    notifications: Mutex<VecDeque<Reply>>,
    configs: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_notifications(&self, reply: Reply) {
        self.notifications.lock().unwrap().push_back(reply);
    }

    /// Queue a 200 notifications answer reporting `changes`.
    pub fn push_changes(&self, changes: &[(&str, i64)]) {
        self.push_notifications(Reply::ok(notifications_body(changes)));
    }

    pub fn push_config(&self, namespace: &str, reply: Reply) {
        self.configs
            .lock()
            .unwrap()
            .entry(namespace.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Queue a 200 configs answer carrying `configurations`.
    pub fn push_payload(&self, namespace: &str, configurations: serde_json::Value) {
        self.push_config(namespace, Reply::ok(configs_body(namespace, configurations)));
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Cursors sent with every notifications request so far.
    pub fn sent_cursors(&self) -> Vec<Vec<NamespaceCursor>> {
        self.requests()
            .iter()
            .filter(|u| u.contains("/notifications/v2"))
            .map(|u| {
                let url = Url::parse(u).unwrap();
                let (_, value) = url
                    .query_pairs()
                    .find(|(k, _)| k == "notifications")
                    .unwrap();
                serde_json::from_str(&value).unwrap()
            })
            .collect()
    }

    /// Namespaces fetched from the configs endpoint, in request order.
    pub fn fetched(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|u| {
                let url = Url::parse(u).unwrap();
                let segments: Vec<_> = url.path_segments()?.collect();
                match segments.as_slice() {
                    ["configs", _, _, namespace] => Some(namespace.to_string()),
                    _ => None,
                }
            })
            .collect()
    }

    fn next_reply(&self, url: &str) -> Reply {
        let parsed = Url::parse(url).unwrap();
        let segments: Vec<String> = parsed
            .path_segments()
            .map(|s| s.map(str::to_string).collect())
            .unwrap_or_default();

        match segments.first().map(String::as_str) {
            Some("notifications") => self
                .notifications
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(Reply::not_modified),
            Some("configs") => {
                let namespace = segments.last().cloned().unwrap_or_default();
                self.configs
                    .lock()
                    .unwrap()
                    .get_mut(&namespace)
                    .and_then(VecDeque::pop_front)
                    .unwrap_or(Reply::Status(404, String::new()))
            }
            _ => Reply::Status(404, String::new()),
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn request(&self, url: &str) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(url.to_string());
        // Suspend once like a real request so concurrent callers interleave
        tokio::task::yield_now().await;
        match self.next_reply(url) {
            Reply::Status(status, body) => Ok(HttpResponse::new(status, body)),
            Reply::TransportError(msg) => Err(WatchError::Transport(msg)),
            Reply::Hang => std::future::pending::<Result<HttpResponse>>().await,
        }
    }
}

/// Event bus that records everything published to it.
#[derive(Clone, Default)]
pub struct RecordingBus {
    events: Arc<Mutex<Vec<ChangeEvent>>>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventBus for RecordingBus {
    async fn publish(&self, event: ChangeEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn notifications_body(changes: &[(&str, i64)]) -> String {
    let list: Vec<ChangeNotification> = changes
        .iter()
        .map(|(ns, id)| ChangeNotification {
            namespace_name: ns.to_string(),
            notification_id: *id,
        })
        .collect();
    serde_json::to_string(&list).unwrap()
}

pub fn configs_body(namespace: &str, configurations: serde_json::Value) -> String {
    json!({
        "appId": "orders",
        "cluster": "default",
        "namespaceName": namespace,
        "configurations": configurations,
        "releaseKey": "20240101000000-release",
    })
    .to_string()
}

pub fn cursor(namespace: &str, id: i64) -> NamespaceCursor {
    NamespaceCursor {
        namespace_name: namespace.to_string(),
        notification_id: id,
    }
}
