//! Notification center: transient alerts shown above the chat.

pub mod center;
pub mod model;

pub use center::{NotificationCenter, spawn_sweep_task};
pub use model::{Notification, NotificationEvent, Severity};
