//! Chat log and collected customer data.

use chrono::Local;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::EditTarget;
use crate::llm::ChatMessage;

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    Bot,
    User,
}

/// One entry of the chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    /// Local wall-clock time, `HH:MM`.
    pub timestamp: String,
    /// Image reference for a menu item mentioned in the message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Message {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            text: text.into(),
            timestamp: Local::now().format("%H:%M").to_string(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: Option<String>) -> Self {
        self.image = image;
        self
    }
}

/// Append-only transcript.
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    messages: Vec<Message>,
}

impl ChatLog {
    pub fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    /// The last `turns` messages as generation history, oldest first.
    pub fn history(&self, turns: usize) -> Vec<ChatMessage> {
        let start = self.messages.len().saturating_sub(turns);
        self.messages[start..]
            .iter()
            .map(|m| match m.sender {
                Sender::Bot => ChatMessage::assistant(m.text.clone()),
                Sender::User => ChatMessage::user(m.text.clone()),
            })
            .collect()
    }
}

/// Customer details collected during checkout. Every field is either empty
/// or holds a validated value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserData {
    pub name: String,
    pub address: String,
    pub payment_method: String,
}

impl UserData {
    /// First missing field, in collection order.
    pub fn missing_field(&self) -> Option<EditTarget> {
        if self.name.trim().is_empty() {
            Some(EditTarget::Name)
        } else if self.address.trim().is_empty() {
            Some(EditTarget::Address)
        } else if self.payment_method.trim().is_empty() {
            Some(EditTarget::Payment)
        } else {
            None
        }
    }

    pub fn field(&self, target: EditTarget) -> &str {
        match target {
            EditTarget::Name => &self.name,
            EditTarget::Address => &self.address,
            EditTarget::Payment => &self.payment_method,
        }
    }
}
