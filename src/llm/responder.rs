//! Response adapter: remote generation with retry, backoff and a local
//! fallback.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use super::fallback::FallbackResponder;
use super::retry::{AttemptOutcome, RetryPolicy};
use super::{ChatMessage, Role, TextGenerator};
use crate::error::GenerationError;
use crate::safety::{sanitize, sanitize_for_responder};

/// Maximum characters kept per history turn in the prompt.
const HISTORY_TURN_MAX_CHARS: usize = 300;

/// Where a reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    Remote,
    Fallback,
}

/// A bot reply plus how it was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub source: ReplySource,
    /// Remote attempts made before this reply.
    pub attempts: u32,
}

/// Maps customer text to a bot reply. Never fails.
pub struct ResponseAdapter {
    generator: Arc<dyn TextGenerator>,
    fallback: FallbackResponder,
    policy: RetryPolicy,
    timeout: Duration,
    system_instruction: String,
    history_turns: usize,
}

impl ResponseAdapter {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        fallback: FallbackResponder,
        policy: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            generator,
            fallback,
            policy,
            timeout,
            system_instruction: crate::config::DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            history_turns: 6,
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    pub fn with_history_turns(mut self, turns: usize) -> Self {
        self.history_turns = turns;
        self
    }

    /// Reply to `text` given prior `history` (oldest first).
    pub async fn respond(&self, text: &str, history: &[ChatMessage]) -> Reply {
        let message = sanitize_for_responder(text);
        let prompt = build_prompt(&self.system_instruction, history, self.history_turns, &message);
        let max_attempts = self.policy.max_attempts();

        let mut attempts = 0;
        while attempts < max_attempts {
            attempts += 1;
            match self.attempt(&prompt).await {
                AttemptOutcome::Success(reply) => {
                    info!(attempts, "Remote reply accepted");
                    return Reply {
                        text: reply,
                        source: ReplySource::Remote,
                        attempts,
                    };
                }
                AttemptOutcome::Abort(error) => {
                    warn!(attempt = attempts, error = %error, "Generation failed, not retrying");
                    break;
                }
                AttemptOutcome::Retry(error) => {
                    warn!(attempt = attempts, max_attempts, error = %error, "Generation attempt failed");
                    if attempts < max_attempts {
                        tokio::time::sleep(self.policy.delay_after(attempts)).await;
                    }
                }
            }
        }

        info!(attempts, "Falling back to local responder");
        Reply {
            text: self.fallback.respond(&message),
            source: ReplySource::Fallback,
            attempts,
        }
    }

    async fn attempt(&self, prompt: &str) -> AttemptOutcome {
        match tokio::time::timeout(self.timeout, self.generator.generate(prompt)).await {
            Err(_) => AttemptOutcome::Abort(GenerationError::Timeout(self.timeout)),
            Ok(Err(error)) => AttemptOutcome::from_error(error),
            Ok(Ok(raw)) => match validate_content(&raw) {
                Ok(text) => AttemptOutcome::Success(text),
                Err(error) => AttemptOutcome::Retry(error),
            },
        }
    }
}

/// Compose the single-text prompt: instruction, recent turns, new message.
pub fn build_prompt(
    system_instruction: &str,
    history: &[ChatMessage],
    max_turns: usize,
    message: &str,
) -> String {
    let start = history.len().saturating_sub(max_turns);
    let mut prompt = String::from(system_instruction.trim());

    if start < history.len() {
        prompt.push_str("\n\nConversa recente:");
        for turn in &history[start..] {
            let speaker = match turn.role {
                Role::User => "Cliente",
                Role::Assistant => "Atendente",
            };
            prompt.push_str(&format!(
                "\n{speaker}: {}",
                sanitize(&turn.content, HISTORY_TURN_MAX_CHARS)
            ));
        }
    }

    prompt.push_str(&format!("\n\nCliente: {message}\nAtendente:"));
    prompt
}

/// Reject transport successes that carry an unusable payload.
pub fn validate_content(raw: &str) -> Result<String, GenerationError> {
    let text = raw.trim();
    let length = text.chars().count();
    let lower = text.to_lowercase();

    let invalid = |reason: &str| GenerationError::InvalidResponse {
        reason: reason.to_string(),
    };

    if length < 2 {
        return Err(invalid("response too short"));
    }
    if lower.starts_with("<!doctype") || lower.contains("<html") {
        return Err(invalid("HTML error page"));
    }
    if lower.contains("error") && length < 50 {
        return Err(invalid("short error message"));
    }
    if lower.contains("undefined") && length < 20 {
        return Err(invalid("undefined payload"));
    }
    Ok(text.to_string())
}
