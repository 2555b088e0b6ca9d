//! YouTube Data API v3 video search.

use super::{format_iso8601_duration, VideoResult, VideoSearch, UNKNOWN_DURATION};
use crate::config::YoutubeSettings;
use crate::error::{Result, StudyflowError};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

/// YouTube search client.
pub struct YoutubeClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    region_code: String,
    relevance_language: String,
}

#[derive(Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    channel_title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    thumbnails: HashMap<String, Thumbnail>,
}

#[derive(Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    content_details: Option<ContentDetails>,
}

#[derive(Deserialize)]
struct ContentDetails {
    duration: String,
}

impl YoutubeClient {
    /// Create a client from settings. Fails if no API key is configured.
    pub fn from_settings(settings: &YoutubeSettings, api_key: Option<String>) -> Result<Self> {
        let api_key = api_key.ok_or_else(|| {
            StudyflowError::Config(
                "No YouTube API key. Set YOUTUBE_API_KEY or youtube.api_key.".to_string(),
            )
        })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            api_key,
            region_code: settings.region_code.clone(),
            relevance_language: settings.relevance_language.clone(),
        })
    }

    fn search_url(&self, query: &str, max_results: usize) -> Result<Url> {
        let max_results = max_results.clamp(1, 50).to_string();
        Ok(Url::parse_with_params(
            &format!("{}/search", self.api_base),
            &[
                ("part", "snippet"),
                ("type", "video"),
                ("q", query),
                ("maxResults", max_results.as_str()),
                ("regionCode", self.region_code.as_str()),
                ("relevanceLanguage", self.relevance_language.as_str()),
                ("safeSearch", "strict"),
                ("key", self.api_key.as_str()),
            ],
        )?)
    }

    fn videos_url(&self, ids: &[String]) -> Result<Url> {
        let ids = ids.join(",");
        Ok(Url::parse_with_params(
            &format!("{}/videos", self.api_base),
            &[
                ("part", "contentDetails"),
                ("id", ids.as_str()),
                ("key", self.api_key.as_str()),
            ],
        )?)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: Url) -> Result<T> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| StudyflowError::VideoSearch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StudyflowError::VideoSearch(format!(
                "YouTube API returned {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| StudyflowError::VideoSearch(format!("Unexpected YouTube response: {}", e)))
    }

    /// Fetch formatted durations for a batch of video ids.
    async fn fetch_durations(&self, ids: &[String]) -> Result<HashMap<String, String>> {
        let videos: VideoListResponse = self.get_json(self.videos_url(ids)?).await?;
        Ok(videos
            .items
            .into_iter()
            .map(|item| {
                let duration = item
                    .content_details
                    .map(|d| format_iso8601_duration(&d.duration))
                    .unwrap_or_else(|| UNKNOWN_DURATION.to_string());
                (item.id, duration)
            })
            .collect())
    }
}

fn pick_thumbnail(thumbnails: &HashMap<String, Thumbnail>) -> Option<String> {
    ["high", "medium", "default"]
        .iter()
        .find_map(|size| thumbnails.get(*size))
        .map(|t| t.url.clone())
}

#[async_trait]
impl VideoSearch for YoutubeClient {
    #[instrument(skip(self), fields(query = %query))]
    async fn search_videos(&self, query: &str, max_results: usize) -> Result<Vec<VideoResult>> {
        let search: SearchListResponse = self.get_json(self.search_url(query, max_results)?).await?;

        let hits: Vec<(String, Snippet)> = search
            .items
            .into_iter()
            .filter_map(|item| item.id.video_id.map(|id| (id, item.snippet)))
            .collect();

        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = hits.iter().map(|(id, _)| id.clone()).collect();

        // Durations are cosmetic; a failed lookup keeps the search results.
        let durations = match self.fetch_durations(&ids).await {
            Ok(d) => d,
            Err(e) => {
                warn!("Failed to fetch video durations: {}", e);
                HashMap::new()
            }
        };

        let results: Vec<VideoResult> = hits
            .into_iter()
            .map(|(id, snippet)| VideoResult {
                url: VideoResult::watch_url(&id),
                duration: durations
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_DURATION.to_string()),
                thumbnail: pick_thumbnail(&snippet.thumbnails),
                title: snippet.title,
                channel: snippet.channel_title,
                description: Some(snippet.description).filter(|d| !d.is_empty()),
                video_id: id,
            })
            .collect();

        debug!("YouTube returned {} videos", results.len());
        Ok(results)
    }
}
