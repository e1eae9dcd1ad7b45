//! Human-readable booking confirmations.
//!
//! The scheduler never depends on this module: it runs after a booking has been
//! committed and the day lock released, and it cannot fail. Any problem talking
//! to the model degrades to a templated message.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::model::{format_timestamp, Event};

pub const DEFAULT_LLM_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "meta-llama/llama-3-8b-instruct";

const MAX_TOKENS: u32 = 256;
const TEMPERATURE: f32 = 0.2;
const SNIPPET_CHARS: usize = 400;
const RAW_REPLY_CHARS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub url: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, event: &Event) -> String;
}

/// Pick the model-backed confirmer when a key is configured, the template otherwise.
pub fn from_config(config: &LlmConfig) -> Arc<dyn Confirmer> {
    match LlmConfirmer::from_config(config) {
        Some(Ok(confirmer)) => Arc::new(confirmer),
        Some(Err(e)) => {
            warn!("LLM client unavailable, using templated confirmations: {e}");
            Arc::new(TemplateConfirmer)
        }
        None => Arc::new(TemplateConfirmer),
    }
}

pub fn confirmation_prompt(event: &Event) -> String {
    format!(
        "You scheduled an event titled '{}' from {} to {} with attendees [{}]. \
         Produce a short friendly confirmation message.",
        event.title,
        format_timestamp(&event.start),
        format_timestamp(&event.end),
        event.attendees.join(", "),
    )
}

fn snippet(prompt: &str) -> String {
    prompt
        .chars()
        .take(SNIPPET_CHARS)
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect()
}

pub fn template_reply(prompt: &str) -> String {
    format!(
        "[MOCK LLM]\nBased on context: {}\n\nReply: (mock) I scheduled your meeting successfully.",
        snippet(prompt)
    )
}

pub fn fallback_reply(prompt: &str) -> String {
    format!(
        "[MOCK LLM - fallback]\nBased on context: {}\n\nReply: (mock fallback) Meeting scheduled.",
        snippet(prompt)
    )
}

/// Used when no model is configured.
pub struct TemplateConfirmer;

#[async_trait]
impl Confirmer for TemplateConfirmer {
    async fn confirm(&self, event: &Event) -> String {
        template_reply(&confirmation_prompt(event))
    }
}

/// OpenAI-compatible chat completion request.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

pub struct LlmConfirmer {
    client: Client,
    url: String,
    model: String,
    api_key: String,
}

impl LlmConfirmer {
    /// `None` when no API key is configured.
    pub fn from_config(config: &LlmConfig) -> Option<Result<Self, reqwest::Error>> {
        let api_key = config.api_key.clone()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Some(client.map(|client| Self {
            client,
            url: config.url.clone(),
            model: config.model.clone(),
            api_key,
        }))
    }

    async fn complete(&self, prompt: &str) -> Result<String, reqwest::Error> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let body: Value = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", "https://openrouter.ai")
            .header("X-Title", "Slotbook")
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(extract_reply(&body))
    }
}

#[async_trait]
impl Confirmer for LlmConfirmer {
    async fn confirm(&self, event: &Event) -> String {
        let prompt = confirmation_prompt(event);
        match self.complete(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("confirmation request failed, using fallback: {e}");
                metrics::counter!(crate::observability::CONFIRMATION_FALLBACKS_TOTAL).increment(1);
                fallback_reply(&prompt)
            }
        }
    }
}

/// First choice's message content (chat shape) or text (completion shape);
/// otherwise the raw body, truncated.
fn extract_reply(body: &Value) -> String {
    let choice = &body["choices"][0];
    if let Some(content) = choice["message"]["content"].as_str() {
        return content.trim().to_string();
    }
    if let Some(text) = choice["text"].as_str() {
        return text.trim().to_string();
    }
    let raw = serde_json::to_string_pretty(body).unwrap_or_default();
    raw.chars().take(RAW_REPLY_CHARS).collect()
}
