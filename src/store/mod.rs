//! Persistence for learning-cycle results.
//!
//! Each saved cycle produces one session row and one row per recommended book or
//! video, so history can be listed per user.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::agents::AgentResult;
use crate::error::Result;
use crate::orchestrator::LearningCycleOutcome;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of stored recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    Book,
    Video,
}

impl fmt::Display for RecommendationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendationKind::Book => f.write_str("book"),
            RecommendationKind::Video => f.write_str("video"),
        }
    }
}

impl FromStr for RecommendationKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "book" => Ok(RecommendationKind::Book),
            "video" => Ok(RecommendationKind::Video),
            other => Err(format!("unknown recommendation kind: {}", other)),
        }
    }
}

/// A single stored recommendation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredRecommendation {
    pub id: Uuid,
    pub user_id: String,
    pub session_id: Uuid,
    pub kind: RecommendationKind,
    pub subject: String,
    pub title: String,
    pub url: Option<String>,
    /// The full recommendation as returned by the agent.
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A stored learning session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LearningSession {
    pub id: Uuid,
    pub user_id: String,
    pub subject: String,
    pub topic: Option<String>,
    pub weak_topics: Vec<String>,
    pub weakness_level: Option<u8>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Trait for recommendation storage backends.
#[async_trait]
pub trait RecommendationStore: Send + Sync {
    /// Save a cycle's session and recommendations. Returns the number of recommendations stored.
    async fn save_cycle(&self, user_id: &str, outcome: &LearningCycleOutcome) -> Result<usize>;

    /// Most recent recommendations for a user, newest first.
    async fn list_recommendations(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredRecommendation>>;

    /// Most recent sessions for a user, newest first.
    async fn list_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<LearningSession>>;
}

fn items<'a>(result: Option<&'a AgentResult>, key: &str) -> Vec<&'a serde_json::Value> {
    result
        .filter(|r| r.is_success())
        .and_then(|r| r.data.as_ref())
        .and_then(|d| d.get(key))
        .and_then(|v| v.as_array())
        .map(|a| a.iter().collect())
        .unwrap_or_default()
}

/// Flatten a cycle outcome into the rows both backends store.
pub fn rows_from_outcome(
    user_id: &str,
    outcome: &LearningCycleOutcome,
) -> (LearningSession, Vec<StoredRecommendation>) {
    let session = LearningSession {
        id: outcome.id,
        user_id: user_id.to_string(),
        subject: outcome.subject.clone(),
        topic: outcome.topic.clone(),
        weak_topics: outcome.weak_topics.clone(),
        weakness_level: outcome.weakness_level,
        status: serde_json::to_value(outcome.status)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default(),
        created_at: outcome.created_at,
    };

    let books = items(outcome.steps.book_recommendations.as_ref(), "recommendations")
        .into_iter()
        .map(|item| (RecommendationKind::Book, item));
    let videos = items(outcome.steps.youtube_recommendations.as_ref(), "videos")
        .into_iter()
        .map(|item| (RecommendationKind::Video, item));

    let recommendations = books
        .chain(videos)
        .filter_map(|(kind, item)| {
            let title = item.get("title")?.as_str()?.trim();
            if title.is_empty() {
                return None;
            }
            Some(StoredRecommendation {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                session_id: outcome.id,
                kind,
                subject: outcome.subject.clone(),
                title: title.to_string(),
                url: item.get("url").and_then(|u| u.as_str()).map(str::to_string),
                details: item.clone(),
                created_at: outcome.created_at,
            })
        })
        .collect();

    (session, recommendations)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::agents::{AgentStatus, BOOK_AGENT, YOUTUBE_AGENT};
    use crate::orchestrator::{CycleSteps, ExecutionSummary, WeakTopicSource};

    pub fn outcome(subject: &str) -> LearningCycleOutcome {
        LearningCycleOutcome {
            id: Uuid::new_v4(),
            status: AgentStatus::Success,
            action: "complete_learning_cycle".into(),
            user_id: Some("u1".into()),
            subject: subject.into(),
            topic: None,
            weak_topics: vec!["Kesirler".into()],
            weak_topics_source: WeakTopicSource::Request,
            weakness_level: Some(6),
            steps: CycleSteps {
                analysis: None,
                book_recommendations: Some(AgentResult::success(
                    BOOK_AGENT,
                    serde_json::json!({"recommendations": [
                        {
                            "title": "Kesirler Soru Bankası",
                            "url": "https://www.dr.com.tr/k",
                            "price": 120.0
                        },
                        {"title": "  "}
                    ], "total_found": 2}),
                )),
                youtube_recommendations: Some(AgentResult::error(YOUTUBE_AGENT, "quota")),
            },
            warnings: Vec::new(),
            execution_summary: ExecutionSummary::default(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_skip_failed_steps_and_blank_titles() {
        let outcome = fixtures::outcome("Matematik");
        let (session, recs) = rows_from_outcome("u1", &outcome);

        assert_eq!(session.id, outcome.id);
        assert_eq!(session.status, "success");
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].kind, RecommendationKind::Book);
        assert_eq!(recs[0].details["price"], 120.0);
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("video".parse::<RecommendationKind>().unwrap(), RecommendationKind::Video);
        assert!("podcast".parse::<RecommendationKind>().is_err());
    }
}
