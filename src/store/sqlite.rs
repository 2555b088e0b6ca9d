//! SQLite recommendation store.

use super::{
    rows_from_outcome, LearningSession, RecommendationKind, RecommendationStore,
    StoredRecommendation,
};
use crate::error::{Result, StudyflowError};
use crate::orchestrator::LearningCycleOutcome;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS learning_sessions (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    subject TEXT NOT NULL,
    topic TEXT,
    weak_topics TEXT NOT NULL,
    weakness_level INTEGER,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_user ON learning_sessions(user_id, created_at);

CREATE TABLE IF NOT EXISTS recommendations (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    session_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    subject TEXT NOT NULL,
    title TEXT NOT NULL,
    url TEXT,
    details TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_recommendations_user ON recommendations(user_id, created_at);
"#;

/// SQLite-backed store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized recommendation store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StudyflowError::Storage(format!("Failed to acquire lock: {}", e)))
    }
}

fn parse_time(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_uuid(s: &str) -> Uuid {
    Uuid::parse_str(s).unwrap_or_default()
}

#[async_trait]
impl RecommendationStore for SqliteStore {
    #[instrument(skip(self, outcome))]
    async fn save_cycle(&self, user_id: &str, outcome: &LearningCycleOutcome) -> Result<usize> {
        let (session, recommendations) = rows_from_outcome(user_id, outcome);
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT OR REPLACE INTO learning_sessions
                (id, user_id, subject, topic, weak_topics, weakness_level, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                session.id.to_string(),
                session.user_id,
                session.subject,
                session.topic,
                serde_json::to_string(&session.weak_topics)?,
                session.weakness_level,
                session.status,
                session.created_at.to_rfc3339(),
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO recommendations
                    (id, user_id, session_id, kind, subject, title, url, details, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )?;
            for rec in &recommendations {
                stmt.execute(params![
                    rec.id.to_string(),
                    rec.user_id,
                    rec.session_id.to_string(),
                    rec.kind.to_string(),
                    rec.subject,
                    rec.title,
                    rec.url,
                    rec.details.to_string(),
                    rec.created_at.to_rfc3339(),
                ])?;
            }
        }

        tx.commit()?;
        debug!("Stored session {} with {} recommendations", session.id, recommendations.len());
        Ok(recommendations.len())
    }

    #[instrument(skip(self))]
    async fn list_recommendations(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredRecommendation>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, session_id, kind, subject, title, url, details, created_at
            FROM recommendations
            WHERE user_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![user_id, limit as i64], |row| {
            let id: String = row.get(0)?;
            let session_id: String = row.get(2)?;
            let kind: String = row.get(3)?;
            let details: String = row.get(7)?;
            let created_at: String = row.get(8)?;
            Ok(StoredRecommendation {
                id: parse_uuid(&id),
                user_id: row.get(1)?,
                session_id: parse_uuid(&session_id),
                kind: kind.parse().unwrap_or(RecommendationKind::Book),
                subject: row.get(4)?,
                title: row.get(5)?,
                url: row.get(6)?,
                details: serde_json::from_str(&details).unwrap_or(serde_json::Value::Null),
                created_at: parse_time(&created_at),
            })
        })?;

        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    #[instrument(skip(self))]
    async fn list_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<LearningSession>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, subject, topic, weak_topics, weakness_level, status, created_at
            FROM learning_sessions
            WHERE user_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![user_id, limit as i64], |row| {
            let id: String = row.get(0)?;
            let weak_topics: String = row.get(4)?;
            let created_at: String = row.get(7)?;
            Ok(LearningSession {
                id: parse_uuid(&id),
                user_id: row.get(1)?,
                subject: row.get(2)?,
                topic: row.get(3)?,
                weak_topics: serde_json::from_str(&weak_topics).unwrap_or_default(),
                weakness_level: row.get(5)?,
                status: row.get(6)?,
                created_at: parse_time(&created_at),
            })
        })?;

        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}
