//! Notification data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How prominent a notification is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Success,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Success => write!(f, "success"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A transient user-facing alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Creation timestamp in milliseconds, unique within a center.
    pub id: i64,
    pub severity: Severity,
    pub message: String,
    /// Dismissible notifications expire on their own.
    pub dismissible: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Whether this notification should be swept at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        self.dismissible && now - self.created_at >= ttl
    }
}

/// Events broadcast to subscribers (e.g. a rendering layer).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    Shown { notification: Notification },
    Removed { id: i64 },
}
