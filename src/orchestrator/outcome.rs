//! Aggregated results returned by the orchestrator.

use crate::agents::{AgentResult, AgentStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

/// Counts and timing for a multi-agent run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExecutionSummary {
    pub elapsed_ms: u64,
    pub total_agents: usize,
    pub successful: usize,
    pub failed: usize,
}

impl ExecutionSummary {
    pub fn from_results<'a>(
        results: impl IntoIterator<Item = &'a AgentResult>,
        elapsed: Duration,
    ) -> Self {
        let mut summary = Self {
            elapsed_ms: elapsed.as_millis() as u64,
            ..Default::default()
        };
        for result in results {
            summary.total_agents += 1;
            if result.is_success() {
                summary.successful += 1;
            } else {
                summary.failed += 1;
            }
        }
        summary
    }

    /// Error only when every scheduled agent failed.
    pub fn status(&self) -> AgentStatus {
        if self.total_agents > 0 && self.successful == 0 {
            AgentStatus::Error
        } else {
            AgentStatus::Success
        }
    }
}

/// Results of a concurrent fan-out, one slot per scheduled agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedOutcome {
    pub status: AgentStatus,
    /// Keyed by agent name.
    pub results: BTreeMap<String, AgentResult>,
    pub execution_summary: ExecutionSummary,
}

impl AggregatedOutcome {
    pub fn get(&self, agent: &str) -> Option<&AgentResult> {
        self.results.get(agent)
    }
}

/// Where the weak topics used for recommendations came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeakTopicSource {
    Request,
    Analysis,
    Merged,
    None,
}

/// Per-step results of a learning cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleSteps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AgentResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_recommendations: Option<AgentResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_recommendations: Option<AgentResult>,
}

impl CycleSteps {
    pub fn iter(&self) -> impl Iterator<Item = &AgentResult> {
        [
            self.analysis.as_ref(),
            self.youtube_recommendations.as_ref(),
            self.book_recommendations.as_ref(),
        ]
        .into_iter()
        .flatten()
    }
}

/// Result of a complete learning cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningCycleOutcome {
    pub id: Uuid,
    pub status: AgentStatus,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub weak_topics: Vec<String>,
    pub weak_topics_source: WeakTopicSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weakness_level: Option<u8>,
    pub steps: CycleSteps,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub execution_summary: ExecutionSummary,
    pub created_at: DateTime<Utc>,
}

/// Response to a dispatched request.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AgentResponse {
    Agent(AgentResult),
    LearningCycle(Box<LearningCycleOutcome>),
}

impl AgentResponse {
    pub fn status(&self) -> AgentStatus {
        match self {
            AgentResponse::Agent(result) => result.status,
            AgentResponse::LearningCycle(outcome) => outcome.status,
        }
    }
}

/// Union of weak-topic lists: trimmed, blanks dropped, case-sensitive, first-seen order.
pub fn reconcile_weak_topics(from_request: &[String], from_analysis: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(from_request.len() + from_analysis.len());
    for topic in from_request.iter().chain(from_analysis) {
        let topic = topic.trim();
        if !topic.is_empty() && !merged.iter().any(|t| t == topic) {
            merged.push(topic.to_string());
        }
    }
    merged
}

/// Reconcile and report which side contributed.
pub fn reconcile_with_source(
    from_request: &[String],
    from_analysis: &[String],
) -> (Vec<String>, WeakTopicSource) {
    let request = reconcile_weak_topics(from_request, &[]);
    let analysis = reconcile_weak_topics(from_analysis, &[]);
    let source = match (request.is_empty(), analysis.is_empty()) {
        (true, true) => WeakTopicSource::None,
        (false, true) => WeakTopicSource::Request,
        (true, false) => WeakTopicSource::Analysis,
        (false, false) => WeakTopicSource::Merged,
    };
    (reconcile_weak_topics(&request, &analysis), source)
}
