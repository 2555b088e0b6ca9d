//! Tavily web search client.

use super::{WebResult, WebSearch};
use crate::config::SearchSettings;
use crate::error::{Result, StudyflowError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Tavily search API client.
pub struct TavilyClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    max_results: usize,
    search_depth: String,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'a str,
    #[serde(skip_serializing_if = "no_domains")]
    include_domains: &'a [String],
}

fn no_domains(domains: &&[String]) -> bool {
    domains.is_empty()
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<TavilyHit>,
}

#[derive(Deserialize)]
struct TavilyHit {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: Option<f32>,
}

impl TavilyClient {
    /// Create a client from settings. Fails if no API key is configured.
    pub fn from_settings(settings: &SearchSettings, api_key: Option<String>) -> Result<Self> {
        let api_key = api_key.ok_or_else(|| {
            StudyflowError::Config(
                "No web search API key. Set TAVILY_API_KEY or search.api_key.".to_string(),
            )
        })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            api_key,
            max_results: settings.max_results,
            search_depth: settings.search_depth.clone(),
        })
    }
}

#[async_trait]
impl WebSearch for TavilyClient {
    #[instrument(skip(self, include_domains), fields(query = %query))]
    async fn search(&self, query: &str, include_domains: &[String]) -> Result<Vec<WebResult>> {
        let body = SearchRequest {
            query,
            max_results: self.max_results,
            search_depth: &self.search_depth,
            include_domains,
        };

        let response = self
            .http
            .post(format!("{}/search", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| StudyflowError::Search(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StudyflowError::Search(format!(
                "Tavily returned {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| StudyflowError::Search(format!("Unexpected Tavily response: {}", e)))?;

        let results: Vec<WebResult> = parsed
            .results
            .into_iter()
            .filter(|hit| url::Url::parse(&hit.url).is_ok())
            .map(|hit| WebResult {
                title: hit.title,
                url: hit.url,
                content: hit.content,
                score: hit.score,
            })
            .collect();

        debug!("Tavily returned {} results", results.len());
        Ok(results)
    }
}
