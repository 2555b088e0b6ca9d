//! Fakes shared by unit tests.

use crate::agents::{Agent, AgentContext, AgentInput, AgentResult};
use crate::config::{Prompts, Settings};
use crate::error::{Result, StudyflowError};
use crate::llm::{CompletionRequest, LanguageModel};
use crate::search::{VideoResult, VideoSearch, WebResult, WebSearch};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Returns scripted responses in order, repeating the last one.
pub struct SequenceLlm {
    responses: Vec<String>,
    calls: AtomicUsize,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl SequenceLlm {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: responses.into_iter().map(str::to_string).collect(),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for SequenceLlm {
    fn model(&self) -> &str {
        "sequence"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let idx = n.min(self.responses.len().saturating_sub(1));
        self.responses
            .get(idx)
            .cloned()
            .ok_or_else(|| StudyflowError::Provider("no scripted response".into()))
    }
}

/// Picks a response by the first needle found in the system or user prompt.
pub struct RoutingLlm {
    routes: Vec<(String, String)>,
}

impl RoutingLlm {
    pub fn new(routes: Vec<(&str, &str)>) -> Self {
        Self {
            routes: routes.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }
}

#[async_trait]
impl LanguageModel for RoutingLlm {
    fn model(&self) -> &str {
        "routing"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.routes
            .iter()
            .find(|(needle, _)| request.system.contains(needle) || request.user.contains(needle))
            .map(|(_, response)| response.clone())
            .ok_or_else(|| StudyflowError::Provider("no route matched".into()))
    }
}

/// Always fails as if the network were down.
pub struct FailingLlm;

#[async_trait]
impl LanguageModel for FailingLlm {
    fn model(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
        Err(StudyflowError::Provider("connection refused".into()))
    }
}

/// Web search returning canned hits, or failing.
pub struct FakeWebSearch {
    results: Option<Vec<WebResult>>,
    pub calls: AtomicUsize,
}

impl FakeWebSearch {
    pub fn with_results(results: Vec<WebResult>) -> Self {
        Self {
            results: Some(results),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            results: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl WebSearch for FakeWebSearch {
    async fn search(&self, _query: &str, _include_domains: &[String]) -> Result<Vec<WebResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.results
            .clone()
            .ok_or_else(|| StudyflowError::Search("search offline".into()))
    }
}

/// Video search returning canned videos, or failing.
pub struct FakeVideoSearch {
    results: Option<Vec<VideoResult>>,
}

impl FakeVideoSearch {
    pub fn with_results(results: Vec<VideoResult>) -> Self {
        Self { results: Some(results) }
    }

    pub fn failing() -> Self {
        Self { results: None }
    }
}

#[async_trait]
impl VideoSearch for FakeVideoSearch {
    async fn search_videos(&self, _query: &str, max_results: usize) -> Result<Vec<VideoResult>> {
        match &self.results {
            Some(videos) => Ok(videos.iter().take(max_results).cloned().collect()),
            None => Err(StudyflowError::VideoSearch("quotaExceeded".into())),
        }
    }
}

pub fn web_hit(title: &str, url: &str, content: &str) -> WebResult {
    WebResult {
        title: title.to_string(),
        url: url.to_string(),
        content: content.to_string(),
        score: None,
    }
}

pub fn video(id: &str, title: &str) -> VideoResult {
    VideoResult {
        video_id: id.to_string(),
        title: title.to_string(),
        channel: "Hoca".to_string(),
        duration: "10:00".to_string(),
        url: VideoResult::watch_url(id),
        thumbnail: None,
        description: None,
    }
}

pub fn context(llm: impl LanguageModel + 'static) -> AgentContext {
    AgentContext::new(Arc::new(llm), Prompts::default(), Settings::default())
}

/// Agent that panics inside `process`.
pub struct PanickingAgent(pub &'static str);

#[async_trait]
impl Agent for PanickingAgent {
    fn name(&self) -> &'static str {
        self.0
    }

    fn description(&self) -> &'static str {
        "panics"
    }

    async fn process(&self, _input: &AgentInput) -> AgentResult {
        panic!("agent exploded")
    }
}

/// Agent that sleeps before answering.
pub struct SlowAgent(pub &'static str, pub Duration);

#[async_trait]
impl Agent for SlowAgent {
    fn name(&self) -> &'static str {
        self.0
    }

    fn description(&self) -> &'static str {
        "slow"
    }

    async fn process(&self, _input: &AgentInput) -> AgentResult {
        tokio::time::sleep(self.1).await;
        AgentResult::success(self.0, serde_json::json!({}))
    }
}

/// Agent that returns a fixed result and records the inputs it saw.
pub struct StaticAgent {
    name: &'static str,
    result: AgentResult,
    pub inputs: Mutex<Vec<AgentInput>>,
}

impl StaticAgent {
    pub fn success(name: &'static str, data: serde_json::Value) -> Self {
        Self {
            name,
            result: AgentResult::success(name, data),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &'static str, error: &str) -> Self {
        Self {
            name,
            result: AgentResult::error(name, error),
            inputs: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Agent for StaticAgent {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        "static"
    }

    async fn process(&self, input: &AgentInput) -> AgentResult {
        self.inputs.lock().unwrap().push(input.clone());
        self.result.clone()
    }
}
