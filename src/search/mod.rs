//! Web and video search adapters.
//!
//! Provides trait-based interfaces so agents do not depend on a particular
//! search provider.

mod duration;
mod tavily;
mod youtube;

pub use duration::{format_iso8601_duration, UNKNOWN_DURATION};
pub use tavily::TavilyClient;
pub use youtube::YoutubeClient;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single web search hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebResult {
    pub title: String,
    pub url: String,
    /// Text snippet from the page.
    pub content: String,
    /// Provider relevance score, if reported.
    #[serde(default)]
    pub score: Option<f32>,
}

/// A single video search hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoResult {
    pub video_id: String,
    pub title: String,
    pub channel: String,
    /// Formatted as `M:SS` or `H:MM:SS`, or `unknown`.
    pub duration: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
}

impl VideoResult {
    /// Watch URL for a video id.
    pub fn watch_url(video_id: &str) -> String {
        format!("https://www.youtube.com/watch?v={}", video_id)
    }
}

/// Trait for web search providers.
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Search the web. Results are not guaranteed to be relevant; callers filter.
    async fn search(&self, query: &str, include_domains: &[String]) -> Result<Vec<WebResult>>;
}

/// Trait for video search providers.
#[async_trait]
pub trait VideoSearch: Send + Sync {
    /// Search for videos. Fails on quota or authentication errors.
    async fn search_videos(&self, query: &str, max_results: usize) -> Result<Vec<VideoResult>>;
}
