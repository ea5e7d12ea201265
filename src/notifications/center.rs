//! Notification center: bounded, de-duplicated, auto-expiring alerts.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info};

use super::model::{Notification, NotificationEvent, Severity};

const DEFAULT_BROADCAST_CAPACITY: usize = 64;

struct Inner {
    visible: VecDeque<Notification>,
    last_id: i64,
}

/// In-memory notification list with broadcast fan-out.
pub struct NotificationCenter {
    inner: RwLock<Inner>,
    max_visible: usize,
    ttl: chrono::Duration,
    tx: broadcast::Sender<NotificationEvent>,
}

impl NotificationCenter {
    /// Create a center holding at most `max_visible` notifications, with
    /// dismissible ones living for `ttl`.
    pub fn new(max_visible: usize, ttl: Duration) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Arc::new(Self {
            inner: RwLock::new(Inner {
                visible: VecDeque::new(),
                last_id: 0,
            }),
            max_visible: max_visible.max(1),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::seconds(5)),
            tx,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.tx.subscribe()
    }

    /// Show a notification. Returns its id, or `None` when the same message
    /// is already visible.
    pub async fn show(
        &self,
        severity: Severity,
        message: impl Into<String>,
        dismissible: bool,
    ) -> Option<i64> {
        self.show_at(severity, message.into(), dismissible, Utc::now()).await
    }

    pub async fn error(&self, message: impl Into<String>) -> Option<i64> {
        self.show(Severity::Error, message, true).await
    }

    pub async fn warning(&self, message: impl Into<String>) -> Option<i64> {
        self.show(Severity::Warning, message, true).await
    }

    pub async fn success(&self, message: impl Into<String>) -> Option<i64> {
        self.show(Severity::Success, message, true).await
    }

    pub async fn info(&self, message: impl Into<String>) -> Option<i64> {
        self.show(Severity::Info, message, true).await
    }

    async fn show_at(
        &self,
        severity: Severity,
        message: String,
        dismissible: bool,
        now: DateTime<Utc>,
    ) -> Option<i64> {
        let mut inner = self.inner.write().await;

        if inner.visible.iter().any(|n| n.message == message) {
            debug!(%message, "Notification already visible, skipping");
            return None;
        }

        let id = now.timestamp_millis().max(inner.last_id + 1);
        inner.last_id = id;

        let notification = Notification {
            id,
            severity,
            message,
            dismissible,
            created_at: now,
        };
        debug!(id, %severity, message = %notification.message, "Notification shown");
        inner.visible.push_back(notification.clone());

        while inner.visible.len() > self.max_visible {
            if let Some(dropped) = inner.visible.pop_front() {
                let _ = self.tx.send(NotificationEvent::Removed { id: dropped.id });
            }
        }

        let _ = self.tx.send(NotificationEvent::Shown { notification });
        Some(id)
    }

    /// Explicitly dismiss a notification.
    pub async fn dismiss(&self, id: i64) -> bool {
        let mut inner = self.inner.write().await;
        let before = inner.visible.len();
        inner.visible.retain(|n| n.id != id);
        let removed = inner.visible.len() != before;
        if removed {
            let _ = self.tx.send(NotificationEvent::Removed { id });
        }
        removed
    }

    /// Dismiss every notification carrying `message`.
    pub async fn dismiss_message(&self, message: &str) -> bool {
        let id = {
            let inner = self.inner.read().await;
            inner.visible.iter().find(|n| n.message == message).map(|n| n.id)
        };
        match id {
            Some(id) => self.dismiss(id).await,
            None => false,
        }
    }

    /// Currently visible notifications, oldest first.
    pub async fn visible(&self) -> Vec<Notification> {
        self.inner.read().await.visible.iter().cloned().collect()
    }

    /// Remove dismissible notifications older than the TTL.
    pub async fn expire_old(&self) -> usize {
        self.expire_at(Utc::now()).await
    }

    pub(crate) async fn expire_at(&self, now: DateTime<Utc>) -> usize {
        let mut inner = self.inner.write().await;
        let mut expired = Vec::new();
        inner.visible.retain(|n| {
            if n.is_expired(now, self.ttl) {
                expired.push(n.id);
                false
            } else {
                true
            }
        });

        for id in &expired {
            let _ = self.tx.send(NotificationEvent::Removed { id: *id });
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "Expired notifications");
        }
        expired.len()
    }
}

/// Spawn a background task that periodically sweeps expired notifications.
pub fn spawn_sweep_task(
    center: Arc<NotificationCenter>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            center.expire_old().await;
        }
    })
}
