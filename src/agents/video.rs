//! Video lesson recommendations.
//!
//! Uses the video search API when configured. If the API is missing, fails or
//! finds nothing, the model suggests lessons from its own knowledge; those carry
//! a YouTube search link instead of a watch link.

use super::fallback::FallbackChain;
use super::{finish, search_phrase, Agent, AgentContext, AgentInput, AgentResult, YOUTUBE_AGENT};
use crate::error::Result;
use crate::search::{VideoResult, VideoSearch, UNKNOWN_DURATION};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use url::Url;

const MAX_VIDEOS: usize = 25;

/// Where the recommendations came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoSource {
    YoutubeApi,
    ModelKnowledge,
}

/// A recommended video.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoRecommendation {
    /// Present only for videos returned by the search API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    pub title: String,
    pub channel: String,
    pub duration: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<VideoResult> for VideoRecommendation {
    fn from(v: VideoResult) -> Self {
        Self {
            video_id: Some(v.video_id),
            title: v.title,
            channel: v.channel,
            duration: v.duration,
            url: v.url,
            thumbnail: v.thumbnail,
            description: v.description,
        }
    }
}

/// Output of the video agent.
#[derive(Debug, Default, Serialize)]
pub struct VideoRecommendations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<VideoSource>,
    pub videos: Vec<VideoRecommendation>,
    pub total_found: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelVideos {
    #[serde(default)]
    videos: Vec<ModelVideo>,
}

#[derive(Debug, Deserialize)]
struct ModelVideo {
    #[serde(default)]
    title: String,
    #[serde(default)]
    channel: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    search_query: Option<String>,
}

fn youtube_search_url(query: &str) -> String {
    Url::parse_with_params("https://www.youtube.com/results", &[("search_query", query)])
        .map(String::from)
        .unwrap_or_else(|_| "https://www.youtube.com".to_string())
}

/// Recommends video lessons for weak topics.
pub struct VideoAgent {
    ctx: AgentContext,
    search: Option<Arc<dyn VideoSearch>>,
}

impl VideoAgent {
    pub fn new(ctx: AgentContext, search: Option<Arc<dyn VideoSearch>>) -> Self {
        Self { ctx, search }
    }

    /// Try the search API. Returns the fallback reason when it yields nothing.
    async fn from_api(
        &self,
        query: &str,
        limit: usize,
    ) -> std::result::Result<Vec<VideoRecommendation>, String> {
        let Some(search) = &self.search else {
            return Err("Video search is not configured".to_string());
        };
        match search.search_videos(query, limit).await {
            Ok(videos) if !videos.is_empty() => Ok(videos.into_iter().map(Into::into).collect()),
            Ok(_) => {
                info!("Video search returned no results");
                Err("Video search found no lessons".to_string())
            }
            Err(e) => {
                warn!("Video search failed: {}", e);
                Err(format!("Video search unavailable: {}", e))
            }
        }
    }

    async fn from_model(
        &self,
        input: &AgentInput,
        topics: String,
        limit: usize,
        fallback_query: &str,
    ) -> Result<(Vec<VideoRecommendation>, Option<String>)> {
        let extra = [("topics", topics), ("max_results", limit.to_string())];
        let prompts = &self.ctx.prompts.videos;
        let outcome = FallbackChain::new(
            self.ctx.llm.as_ref(),
            self.ctx.json_request(&prompts.system, &prompts.user, input, &extra),
        )
        .with_simplified(self.ctx.json_request(&prompts.system, &prompts.simplified, input, &extra))
        .run::<ModelVideos, _>(|| None)
        .await?;
        let note = outcome.note();

        let videos = outcome
            .value
            .videos
            .into_iter()
            .filter(|v| !v.title.trim().is_empty())
            .take(limit)
            .map(|v| {
                let query = v
                    .search_query
                    .filter(|q| !q.trim().is_empty())
                    .unwrap_or_else(|| {
                        format!("{} {}", v.title.trim(), v.channel.trim())
                            .trim()
                            .to_string()
                    });
                let query = if query.is_empty() {
                    fallback_query.to_string()
                } else {
                    query
                };
                VideoRecommendation {
                    video_id: None,
                    title: v.title.trim().to_string(),
                    channel: v.channel.trim().to_string(),
                    duration: UNKNOWN_DURATION.to_string(),
                    url: youtube_search_url(&query),
                    thumbnail: None,
                    description: v.description,
                }
            })
            .collect();
        Ok((videos, note))
    }

    #[instrument(skip(self, input), fields(subject = ?input.subject))]
    async fn recommend(&self, input: &AgentInput) -> Result<VideoRecommendations> {
        let weak_topics = input.clean_weak_topics();
        let max_topics = self.ctx.settings.orchestrator.max_query_topics;
        let phrase = match input.query() {
            Some(q) => Some(q.to_string()),
            None => search_phrase(&weak_topics, input.subject(), max_topics),
        };
        let Some(phrase) = phrase else {
            return Ok(VideoRecommendations::default());
        };

        let settings = &self.ctx.settings.youtube;
        let query = format!("{} {}", phrase, settings.query_suffix).trim().to_string();
        let limit = input.max_results.unwrap_or(settings.max_results).clamp(1, MAX_VIDEOS);

        let (videos, source, note) = match self.from_api(&query, limit).await {
            Ok(videos) => (videos, VideoSource::YoutubeApi, None),
            Err(reason) => {
                let topics = if weak_topics.is_empty() {
                    phrase.clone()
                } else {
                    weak_topics.join(", ")
                };
                let (videos, degraded) = self.from_model(input, topics, limit, &query).await?;
                let note = match degraded {
                    Some(d) => format!("{}. {}", reason, d),
                    None => format!(
                        "{}; suggestions come from the model and link to YouTube search",
                        reason
                    ),
                };
                (videos, VideoSource::ModelKnowledge, Some(note))
            }
        };

        Ok(VideoRecommendations {
            query: Some(query),
            source: Some(source),
            total_found: videos.len(),
            videos,
            note,
        })
    }
}

#[async_trait]
impl Agent for VideoAgent {
    fn name(&self) -> &'static str {
        YOUTUBE_AGENT
    }

    fn description(&self) -> &'static str {
        "Recommends YouTube lessons for weak topics"
    }

    async fn process(&self, input: &AgentInput) -> AgentResult {
        finish(YOUTUBE_AGENT, self.recommend(input).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentStatus;
    use crate::testing::{context, video, FailingLlm, FakeVideoSearch, SequenceLlm};

    fn input() -> AgentInput {
        AgentInput {
            subject: Some("Matematik".into()),
            weak_topics: vec!["Kesirler".into(), "Oran".into()],
            max_results: Some(2),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_api_results_are_used() {
        let search = Arc::new(FakeVideoSearch::with_results(vec![
            video("a1", "Kesirler 1"),
            video("a2", "Kesirler 2"),
            video("a3", "Kesirler 3"),
        ]));
        let agent = VideoAgent::new(context(SequenceLlm::new(vec![])), Some(search));

        let data = agent.process(&input()).await.data.unwrap();
        assert_eq!(data["source"], "youtube_api");
        assert_eq!(data["total_found"], 2);
        assert_eq!(data["videos"][0]["url"], "https://www.youtube.com/watch?v=a1");
        assert_eq!(data["query"], "Matematik Kesirler, Oran konu anlatımı");
    }

    #[tokio::test]
    async fn test_api_failure_falls_back_to_model() {
        let llm = SequenceLlm::new(vec![
            r#"{"videos": [{
                "title": "Kesirler Konu Anlatımı",
                "channel": "Tonguç",
                "search_query": "tonguç kesirler"
            }]}"#,
        ]);
        let agent = VideoAgent::new(context(llm), Some(Arc::new(FakeVideoSearch::failing())));

        let result = agent.process(&input()).await;
        assert_eq!(result.status, AgentStatus::Success);
        let data = result.data.unwrap();
        assert_eq!(data["source"], "model_knowledge");
        assert!(data["note"].as_str().unwrap().contains("quotaExceeded"));

        let video = &data["videos"][0];
        assert!(video.get("video_id").is_none());
        assert_eq!(video["duration"], "unknown");
        assert!(video["url"]
            .as_str()
            .unwrap()
            .starts_with("https://www.youtube.com/results?search_query=tongu"));
    }

    #[tokio::test]
    async fn test_no_topics_and_no_subject_short_circuits() {
        let agent = VideoAgent::new(context(FailingLlm), None);
        let result = agent.process(&AgentInput::default()).await;
        assert_eq!(result.status, AgentStatus::Success);
        assert_eq!(result.data.unwrap(), serde_json::json!({"videos": [], "total_found": 0}));
    }

    #[tokio::test]
    async fn test_no_api_and_failing_model_is_error() {
        let agent = VideoAgent::new(context(FailingLlm), None);
        let result = agent.process(&input()).await;
        assert_eq!(result.status, AgentStatus::Error);
    }
}
