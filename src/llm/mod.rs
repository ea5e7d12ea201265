//! Text generation for free-form customer messages.
//!
//! - [`TextGenerator`]: the remote endpoint seam, with an HTTP implementation
//! - [`ResponseAdapter`]: retry/backoff around the generator, falling back
//!   to the deterministic [`FallbackResponder`]
//! - [`ImageGenerator`]: image-reference URLs for menu items

pub mod fallback;
pub mod image;
pub mod responder;
pub mod retry;

pub use fallback::{FallbackResponder, Intent};
pub use image::ImageGenerator;
pub use responder::{Reply, ReplySource, ResponseAdapter, build_prompt, validate_content};
pub use retry::RetryPolicy;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A remote endpoint that turns a prompt into raw text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// POSTs the prompt as a plain-text body and returns the raw response text.
pub struct HttpTextGenerator {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpTextGenerator {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(prompt.to_string())
            .send()
            .await
            .map_err(|e| GenerationError::RequestFailed(e.to_string()))?;

        let status = resp.status();
        if status.is_client_error() {
            return Err(GenerationError::ClientError {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(GenerationError::ServerError {
                status: status.as_u16(),
            });
        }

        resp.text()
            .await
            .map_err(|e| GenerationError::RequestFailed(e.to_string()))
    }
}
