//! In-memory recommendation store.
//!
//! Nothing is ever evicted, so this suits tests and short-lived embedding only.

use super::{rows_from_outcome, LearningSession, RecommendationStore, StoredRecommendation};
use crate::error::{Result, StudyflowError};
use crate::orchestrator::LearningCycleOutcome;
use async_trait::async_trait;
use std::sync::RwLock;

#[derive(Default)]
struct Tables {
    sessions: Vec<LearningSession>,
    recommendations: Vec<StoredRecommendation>,
}

/// In-memory store.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> StudyflowError {
    StudyflowError::Storage(format!("Failed to acquire lock: {}", e))
}

#[async_trait]
impl RecommendationStore for MemoryStore {
    async fn save_cycle(&self, user_id: &str, outcome: &LearningCycleOutcome) -> Result<usize> {
        let (session, recommendations) = rows_from_outcome(user_id, outcome);
        let count = recommendations.len();
        let mut tables = self.tables.write().map_err(poisoned)?;
        tables.sessions.push(session);
        tables.recommendations.extend(recommendations);
        Ok(count)
    }

    async fn list_recommendations(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredRecommendation>> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables
            .recommendations
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<LearningSession>> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables
            .sessions
            .iter()
            .rev()
            .filter(|s| s.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures;

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.save_cycle("u1", &fixtures::outcome("Matematik")).await.unwrap(), 1);
        store.save_cycle("u1", &fixtures::outcome("Fizik")).await.unwrap();
        store.save_cycle("u2", &fixtures::outcome("Kimya")).await.unwrap();

        let sessions = store.list_sessions("u1", 10).await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].subject, "Fizik");

        let recs = store.list_recommendations("u1", 1).await.unwrap();
        assert_eq!(recs.len(), 1);
        assert!(store.list_sessions("nobody", 10).await.unwrap().is_empty());
    }
}
