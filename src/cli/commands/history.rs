//! History command - saved sessions and recommendations for a user.

use crate::cli::Output;
use crate::config::Settings;
use crate::store::{RecommendationKind, RecommendationStore, SqliteStore};
use anyhow::Result;

/// Print a user's saved learning history.
pub async fn run_history(user_id: &str, limit: usize, settings: Settings) -> Result<()> {
    if !settings.storage.enabled {
        Output::warning("Storage is disabled (storage.enabled = false); nothing was saved.");
        return Ok(());
    }

    let path = settings.sqlite_path();
    if !path.exists() {
        Output::info(&format!("No history yet ({} does not exist).", path.display()));
        return Ok(());
    }

    let store = SqliteStore::new(&path)?;
    print_history(&store, user_id, limit).await
}

async fn print_history(store: &dyn RecommendationStore, user_id: &str, limit: usize) -> Result<()> {
    let sessions = store.list_sessions(user_id, limit).await?;
    if sessions.is_empty() {
        Output::info(&format!("No sessions saved for {}.", user_id));
        return Ok(());
    }

    Output::header(&format!("Sessions for {}", user_id));
    for session in &sessions {
        let topics = if session.weak_topics.is_empty() {
            "no weak topics".to_string()
        } else {
            session.weak_topics.join(", ")
        };
        let level = session
            .weakness_level
            .map(|l| format!(", level {}/10", l))
            .unwrap_or_default();
        Output::list_item(&format!(
            "{} {}: {}{} [{}]",
            session.created_at.format("%Y-%m-%d %H:%M"),
            session.subject,
            topics,
            level,
            session.status
        ));
    }

    let recommendations = store.list_recommendations(user_id, limit).await?;
    if !recommendations.is_empty() {
        Output::header("Recent recommendations");
        for rec in &recommendations {
            let kind = match rec.kind {
                RecommendationKind::Book => "book",
                RecommendationKind::Video => "video",
            };
            let detail = format!("({}, {})", kind, rec.subject);
            Output::recommendation(&rec.title, Some(&detail), rec.url.as_deref());
        }
    }
    Ok(())
}
