//! Chat-completion adapter used by every agent.
//!
//! Agents hold an `Arc<dyn LanguageModel>` rather than a concrete client, so the
//! provider can be swapped (or faked in tests) without touching agent code.

mod gemini;
mod structured;

pub use gemini::{create_client, GeminiClient};
pub use structured::{complete_structured, extract_json, parse_structured};

use crate::error::Result;
use async_trait::async_trait;

/// A single chat-completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt.
    pub system: String,
    /// User prompt.
    pub user: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Ask the provider for a JSON object response.
    pub json: bool,
}

impl CompletionRequest {
    /// Create a request expecting a JSON object response.
    pub fn json(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: 0.4,
            json: true,
        }
    }

    /// Create a request expecting free text.
    pub fn text(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: 0.7,
            json: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Trait for chat-completion providers.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier, for logging.
    fn model(&self) -> &str;

    /// Run a completion and return the raw message content.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}
