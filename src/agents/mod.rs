//! Single-purpose agents.
//!
//! Every agent wraps one LLM interaction (optionally preceded by a search call)
//! behind the same contract: [`Agent::process`] takes an [`AgentInput`] and always
//! returns an [`AgentResult`]. Failures are reported through `status`, never by
//! returning `Err` or panicking across the boundary, so callers can branch on the
//! envelope without their own error handling.

mod analysis;
mod book;
pub mod fallback;
mod general;
mod question;
mod video;

pub use analysis::{
    AnalysisAgent, PerformanceAnalysis, PerformanceData, TopicResult, WeaknessSnapshot,
};
pub use book::{extract_price, BookAgent, BookRecommendation, BookRecommendations};
pub use general::{GeneralAgent, GeneralAnswer};
pub use question::{normalize_question, Difficulty, Question, QuestionAgent, QuestionSet};
pub use video::{VideoAgent, VideoRecommendation, VideoRecommendations, VideoSource};

use crate::config::{Prompts, Settings};
use crate::error::Result;
use crate::llm::{CompletionRequest, LanguageModel};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

pub const QUESTION_AGENT: &str = "question_agent";
pub const ANALYSIS_AGENT: &str = "analysis_agent";
pub const BOOK_AGENT: &str = "book_agent";
pub const YOUTUBE_AGENT: &str = "youtube_agent";
pub const GENERAL_AGENT: &str = "general_agent";

/// Outcome of an agent call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Success,
    Error,
}

/// Uniform result envelope produced by every agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub status: AgentStatus,
    /// Name of the agent that produced this result.
    pub agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentResult {
    pub fn success(agent: &str, data: serde_json::Value) -> Self {
        Self {
            status: AgentStatus::Success,
            agent: agent.to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn error(agent: &str, error: impl std::fmt::Display) -> Self {
        Self {
            status: AgentStatus::Error,
            agent: agent.to_string(),
            data: None,
            error: Some(error.to_string()),
        }
    }

    /// Convert an agent's internal outcome into the envelope.
    pub fn from_outcome<T: Serialize>(agent: &str, outcome: Result<T>) -> Self {
        match outcome {
            Ok(value) => match serde_json::to_value(value) {
                Ok(data) => Self::success(agent, data),
                Err(e) => Self::error(agent, format!("Failed to serialize result: {}", e)),
            },
            Err(e) => Self::error(agent, e),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == AgentStatus::Success
    }
}

/// Input handed to a single agent call.
///
/// Each concurrent task receives its own clone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentInput {
    pub subject: Option<String>,
    pub topic: Option<String>,
    #[serde(default)]
    pub weak_topics: Vec<String>,
    pub performance: Option<PerformanceData>,
    pub education_level: Option<String>,
    /// Number of questions to generate.
    pub count: Option<usize>,
    pub difficulty: Option<Difficulty>,
    /// Question texts that must not be generated again.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Free-form query, or a precomputed search phrase for recommendation agents.
    pub query: Option<String>,
    /// Extra context for free-form questions.
    pub context: Option<String>,
    pub max_results: Option<usize>,
}

impl AgentInput {
    pub fn subject(&self) -> Option<&str> {
        non_empty(self.subject.as_deref())
    }

    pub fn topic(&self) -> Option<&str> {
        non_empty(self.topic.as_deref())
    }

    pub fn query(&self) -> Option<&str> {
        non_empty(self.query.as_deref())
    }

    /// Weak topics with blanks removed.
    pub fn clean_weak_topics(&self) -> Vec<String> {
        self.weak_topics
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Join the first `max_topics` weak topics into a search phrase, falling back to
/// the subject. Returns `None` when neither exists.
pub fn search_phrase(
    weak_topics: &[String],
    subject: Option<&str>,
    max_topics: usize,
) -> Option<String> {
    let topics: Vec<&str> = weak_topics
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .take(max_topics.max(1))
        .collect();

    match (topics.is_empty(), non_empty(subject)) {
        (false, Some(subject)) => Some(format!("{} {}", subject, topics.join(", "))),
        (false, None) => Some(topics.join(", ")),
        (true, Some(subject)) => Some(subject.to_string()),
        (true, None) => None,
    }
}

/// Shared handles every agent needs.
#[derive(Clone)]
pub struct AgentContext {
    pub llm: Arc<dyn LanguageModel>,
    pub prompts: Arc<Prompts>,
    pub settings: Arc<Settings>,
}

impl AgentContext {
    pub fn new(llm: Arc<dyn LanguageModel>, prompts: Prompts, settings: Settings) -> Self {
        Self {
            llm,
            prompts: Arc::new(prompts),
            settings: Arc::new(settings),
        }
    }

    /// Render a template with the common variables of `input` plus `extra`.
    pub fn render(&self, template: &str, input: &AgentInput, extra: &[(&str, String)]) -> String {
        let mut vars = HashMap::new();
        vars.insert("language".to_string(), self.settings.general.language.clone());
        vars.insert(
            "education_level".to_string(),
            non_empty(input.education_level.as_deref())
                .unwrap_or(&self.settings.general.default_education_level)
                .to_string(),
        );
        vars.insert("subject".to_string(), input.subject().unwrap_or("-").to_string());
        vars.insert("topic".to_string(), input.topic().unwrap_or("-").to_string());
        for (key, value) in extra {
            vars.insert(key.to_string(), value.clone());
        }
        self.prompts.render_with_custom(template, &vars)
    }

    /// Build a JSON-mode completion request from a system and user template.
    pub fn json_request(
        &self,
        system: &str,
        user: &str,
        input: &AgentInput,
        extra: &[(&str, String)],
    ) -> CompletionRequest {
        CompletionRequest::json(self.render(system, input, extra), self.render(user, input, extra))
            .with_temperature(self.settings.llm.temperature)
    }
}

/// Trait implemented by every single-purpose agent.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Stable agent name, used as the key in aggregated results.
    fn name(&self) -> &'static str;

    /// One-line description for agent listings.
    fn description(&self) -> &'static str;

    /// Run the agent. Never fails; errors are carried in the result envelope.
    async fn process(&self, input: &AgentInput) -> AgentResult;
}

/// Log and wrap an agent outcome.
pub(crate) fn finish<T: Serialize>(agent: &str, outcome: Result<T>) -> AgentResult {
    match &outcome {
        Ok(_) => info!(agent, "Agent completed"),
        Err(e) => warn!(agent, "Agent failed: {}", e),
    }
    AgentResult::from_outcome(agent, outcome)
}
