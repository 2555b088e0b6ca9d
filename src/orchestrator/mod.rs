//! Request dispatch and multi-agent coordination.
//!
//! The orchestrator owns one instance of every agent. Single actions run one
//! agent; the learning cycle runs the analysis agent first and then fans the
//! recommendation agents out concurrently. Every agent runs in its own task, so
//! a panic, error or timeout in one branch never disturbs the others.

mod outcome;
mod request;

pub use outcome::{
    reconcile_weak_topics, reconcile_with_source, AgentResponse, AggregatedOutcome, CycleSteps,
    ExecutionSummary, LearningCycleOutcome, WeakTopicSource,
};
pub use request::{
    AgentRequest, AnalysisRequest, GeneralQueryRequest, LearningCycleRequest, QuestionRequest,
    RecommendationRequest, ACTIONS,
};

use crate::agents::{
    search_phrase, Agent, AgentContext, AgentInput, AgentResult, AnalysisAgent, BookAgent,
    GeneralAgent, QuestionAgent, VideoAgent, WeaknessSnapshot, ANALYSIS_AGENT, BOOK_AGENT,
    YOUTUBE_AGENT,
};
use crate::config::{Prompts, Settings};
use crate::error::{Result, StudyflowError};
use crate::llm::{GeminiClient, LanguageModel};
use crate::search::{TavilyClient, VideoSearch, WebSearch, YoutubeClient};
use crate::store::{RecommendationStore, SqliteStore};
use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// One instance of every agent.
#[derive(Clone)]
pub struct AgentSet {
    pub questions: Arc<dyn Agent>,
    pub analysis: Arc<dyn Agent>,
    pub books: Arc<dyn Agent>,
    pub videos: Arc<dyn Agent>,
    pub general: Arc<dyn Agent>,
}

impl AgentSet {
    /// Build the standard agents around shared clients.
    pub fn standard(
        ctx: AgentContext,
        web: Option<Arc<dyn WebSearch>>,
        video: Option<Arc<dyn VideoSearch>>,
    ) -> Self {
        Self {
            questions: Arc::new(QuestionAgent::new(ctx.clone())),
            analysis: Arc::new(AnalysisAgent::new(ctx.clone())),
            books: Arc::new(BookAgent::new(ctx.clone(), web)),
            videos: Arc::new(VideoAgent::new(ctx.clone(), video)),
            general: Arc::new(GeneralAgent::new(ctx)),
        }
    }

    fn all(&self) -> [&Arc<dyn Agent>; 5] {
        [&self.questions, &self.analysis, &self.books, &self.videos, &self.general]
    }
}

/// Agent listing entry.
#[derive(Debug, Clone, Serialize)]
pub struct AgentInfo {
    pub name: &'static str,
    pub description: &'static str,
}

/// The main orchestrator.
pub struct Orchestrator {
    settings: Settings,
    agents: AgentSet,
    store: Option<Arc<dyn RecommendationStore>>,
}

impl Orchestrator {
    /// Create an orchestrator from settings, building real clients.
    ///
    /// Web and video search are optional; agents degrade without them.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let llm: Arc<dyn LanguageModel> =
            Arc::new(GeminiClient::from_settings(&settings.llm, settings.llm_api_key())?);

        let web: Option<Arc<dyn WebSearch>> =
            match TavilyClient::from_settings(&settings.search, settings.search_api_key()) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    warn!("Book search disabled: {}", e);
                    None
                }
            };

        let video: Option<Arc<dyn VideoSearch>> =
            match YoutubeClient::from_settings(&settings.youtube, settings.youtube_api_key()) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    warn!("YouTube search disabled, using model suggestions: {}", e);
                    None
                }
            };

        let store = open_store(&settings)?;

        info!("Orchestrator ready (model: {})", llm.model());
        Ok(Self::with_components(settings, prompts, llm, web, video, store))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        llm: Arc<dyn LanguageModel>,
        web: Option<Arc<dyn WebSearch>>,
        video: Option<Arc<dyn VideoSearch>>,
        store: Option<Arc<dyn RecommendationStore>>,
    ) -> Self {
        let ctx = AgentContext::new(llm, prompts, settings.clone());
        Self::with_agents(settings, AgentSet::standard(ctx, web, video), store)
    }

    /// Create an orchestrator around an explicit agent set.
    pub fn with_agents(
        settings: Settings,
        agents: AgentSet,
        store: Option<Arc<dyn RecommendationStore>>,
    ) -> Self {
        Self {
            settings,
            agents,
            store,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The recommendation store, if persistence is available.
    pub fn store(&self) -> Option<Arc<dyn RecommendationStore>> {
        self.store.clone()
    }

    /// Names and descriptions of all agents.
    pub fn agents_info(&self) -> Vec<AgentInfo> {
        self.agents
            .all()
            .iter()
            .map(|a| AgentInfo {
                name: a.name(),
                description: a.description(),
            })
            .collect()
    }

    /// Validate and dispatch a request.
    ///
    /// Invalid input fails with [`StudyflowError::InvalidInput`]. Agent failures are
    /// not errors here; they come back inside the response with `status: "error"`.
    #[instrument(skip(self, request), fields(action = request.action()))]
    pub async fn handle(&self, request: AgentRequest) -> Result<AgentResponse> {
        request.validate()?;

        let (agent, input) = match &request {
            AgentRequest::GenerateQuestions(r) => (&self.agents.questions, AgentInput::from(r)),
            AgentRequest::AnalyzePerformance(r) => (&self.agents.analysis, AgentInput::from(r)),
            AgentRequest::RecommendYoutube(r) => (&self.agents.videos, AgentInput::from(r)),
            AgentRequest::RecommendBooks(r) => (&self.agents.books, AgentInput::from(r)),
            AgentRequest::GeneralQuery(r) => (&self.agents.general, AgentInput::from(r)),
            AgentRequest::CompleteLearningCycle(r) => {
                let outcome = self.complete_learning_cycle(r).await?;
                return Ok(AgentResponse::LearningCycle(Box::new(outcome)));
            }
        };

        let result = self.run_one(agent.clone(), input).await;
        Ok(AgentResponse::Agent(result))
    }

    /// Run one agent in its own task with the configured timeout.
    pub async fn run_one(&self, agent: Arc<dyn Agent>, input: AgentInput) -> AgentResult {
        let name = agent.name();
        settle(name, spawn_agent(agent, input, self.settings.orchestrator.agent_timeout()).await)
    }

    /// Run agents concurrently and wait for all of them.
    ///
    /// The outcome holds exactly one result per scheduled agent, keyed by name.
    pub async fn fan_out(&self, jobs: Vec<(Arc<dyn Agent>, AgentInput)>) -> AggregatedOutcome {
        let started = Instant::now();
        let timeout = self.settings.orchestrator.agent_timeout();

        let handles: Vec<(&'static str, JoinHandle<AgentResult>)> = jobs
            .into_iter()
            .map(|(agent, input)| (agent.name(), spawn_agent(agent, input, timeout)))
            .collect();
        debug!("Launched {} agents", handles.len());

        let settled = join_all(
            handles
                .into_iter()
                .map(|(name, handle)| async move { (name, settle(name, handle.await)) }),
        )
        .await;

        let mut results = BTreeMap::new();
        for (name, result) in settled {
            results.insert(name.to_string(), result);
        }

        let execution_summary = ExecutionSummary::from_results(results.values(), started.elapsed());
        AggregatedOutcome {
            status: execution_summary.status(),
            results,
            execution_summary,
        }
    }

    /// Analyse performance (when supplied), then recommend books and videos concurrently.
    #[instrument(skip(self, request), fields(subject = %request.subject))]
    pub async fn complete_learning_cycle(
        &self,
        request: &LearningCycleRequest,
    ) -> Result<LearningCycleOutcome> {
        let started = Instant::now();
        let mut warnings = Vec::new();

        let request_topics = reconcile_weak_topics(&request.weak_topics, &[]);
        let analysis = match &request.performance_data {
            Some(perf) if request_topics.is_empty() => {
                let input = AgentInput {
                    subject: Some(request.subject.clone()),
                    topic: request.topic.clone(),
                    performance: Some(perf.clone()),
                    education_level: request.education_level.clone(),
                    ..Default::default()
                };
                Some(self.run_one(self.agents.analysis.clone(), input).await)
            }
            Some(_) => {
                debug!("Weak topics supplied, skipping analysis");
                None
            }
            None => None,
        };

        let snapshot = analysis.as_ref().and_then(WeaknessSnapshot::from_result);
        if let Some(result) = analysis.as_ref().filter(|r| !r.is_success()) {
            let reason = result.error.as_deref().unwrap_or("unknown error");
            warn!("Analysis step failed, continuing with request topics: {}", reason);
            warnings.push(format!("Performance analysis failed: {}", reason));
        }

        let analysis_topics = snapshot.as_ref().map(|s| s.weak_topics.clone()).unwrap_or_default();
        let (weak_topics, weak_topics_source) =
            reconcile_with_source(&request_topics, &analysis_topics);
        info!("Weak topics: {:?} ({:?})", weak_topics, weak_topics_source);

        let mut steps = CycleSteps {
            analysis,
            ..Default::default()
        };

        if !request.skip_recommendations {
            let query = search_phrase(
                &weak_topics,
                Some(&request.subject),
                self.settings.orchestrator.max_query_topics,
            );
            let input = AgentInput {
                subject: Some(request.subject.clone()),
                topic: request.topic.clone(),
                weak_topics: weak_topics.clone(),
                education_level: request.education_level.clone(),
                query,
                ..Default::default()
            };
            let mut fanned = self
                .fan_out(vec![
                    (self.agents.books.clone(), input.clone()),
                    (self.agents.videos.clone(), input),
                ])
                .await;
            steps.book_recommendations = fanned.results.remove(BOOK_AGENT);
            steps.youtube_recommendations = fanned.results.remove(YOUTUBE_AGENT);
        }

        let execution_summary = ExecutionSummary::from_results(steps.iter(), started.elapsed());
        let outcome = LearningCycleOutcome {
            id: Uuid::new_v4(),
            status: execution_summary.status(),
            action: "complete_learning_cycle".to_string(),
            user_id: request.user_id.clone(),
            subject: request.subject.trim().to_string(),
            topic: request.topic.clone(),
            weak_topics,
            weak_topics_source,
            weakness_level: snapshot.and_then(|s| s.weakness_level),
            steps,
            warnings,
            execution_summary,
            created_at: Utc::now(),
        };

        self.persist(&outcome).await;
        Ok(outcome)
    }

    /// Save the cycle for its user. Failures are logged, never returned.
    async fn persist(&self, outcome: &LearningCycleOutcome) {
        let (Some(store), Some(user_id)) = (&self.store, outcome.user_id.as_deref()) else {
            return;
        };
        match store.save_cycle(user_id, outcome).await {
            Ok(count) => debug!("Persisted {} recommendations for {}", count, user_id),
            Err(e) => warn!("Failed to persist learning cycle for {}: {}", user_id, e),
        }
    }
}

/// Open the configured store. Disabled storage keeps nothing, not even in memory.
fn open_store(settings: &Settings) -> Result<Option<Arc<dyn RecommendationStore>>> {
    if !settings.storage.enabled {
        debug!("Storage disabled, learning cycles will not be saved");
        return Ok(None);
    }
    let store: Arc<dyn RecommendationStore> = Arc::new(SqliteStore::new(&settings.sqlite_path())?);
    Ok(Some(store))
}

fn spawn_agent(
    agent: Arc<dyn Agent>,
    input: AgentInput,
    timeout: Option<Duration>,
) -> JoinHandle<AgentResult> {
    tokio::spawn(async move {
        let name = agent.name();
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, agent.process(&input)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(agent = name, "Agent timed out");
                    AgentResult::error(name, StudyflowError::Timeout(limit.as_secs()))
                }
            },
            None => agent.process(&input).await,
        }
    })
}

/// Turn a joined task into a result, converting panics and cancellations.
fn settle(
    name: &str,
    joined: std::result::Result<AgentResult, tokio::task::JoinError>,
) -> AgentResult {
    match joined {
        Ok(result) => result,
        Err(e) if e.is_panic() => {
            let payload = e.into_panic();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(agent = name, "Agent panicked: {}", message);
            AgentResult::error(name, format!("Agent panicked: {}", message))
        }
        Err(e) => AgentResult::error(name, format!("Agent task failed: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentStatus, GENERAL_AGENT, QUESTION_AGENT};
    use crate::store::MemoryStore;
    use crate::testing::{
        web_hit, FailingLlm, FakeVideoSearch, FakeWebSearch, PanickingAgent, RoutingLlm, SlowAgent,
        StaticAgent,
    };
    use serde_json::json;

    fn performance() -> serde_json::Value {
        json!({
            "totalQuestions": 10,
            "correctAnswers": 4,
            "topicResults": [
                {"topic": "Kesirler", "total": 5, "correct": 1},
                {"topic": "Oran", "total": 5, "correct": 3}
            ]
        })
    }

    fn empty_books() -> Arc<dyn Agent> {
        Arc::new(StaticAgent::success(
            BOOK_AGENT,
            json!({"recommendations": [], "total_found": 0}),
        ))
    }

    fn empty_videos() -> Arc<dyn Agent> {
        Arc::new(StaticAgent::success(
            YOUTUBE_AGENT,
            json!({"videos": [], "total_found": 0}),
        ))
    }

    fn static_set(
        books: Arc<dyn Agent>,
        videos: Arc<dyn Agent>,
        analysis: Arc<dyn Agent>,
    ) -> AgentSet {
        AgentSet {
            questions: Arc::new(StaticAgent::success(QUESTION_AGENT, json!({}))),
            analysis,
            books,
            videos,
            general: Arc::new(StaticAgent::success(GENERAL_AGENT, json!({}))),
        }
    }

    fn cycle_request(json: serde_json::Value) -> LearningCycleRequest {
        serde_json::from_value(json).unwrap()
    }

    #[tokio::test]
    async fn test_cycle_with_failing_llm_reports_every_step() {
        let orchestrator = Orchestrator::with_components(
            Settings::default(),
            Prompts::default(),
            Arc::new(FailingLlm),
            Some(Arc::new(FakeWebSearch::failing())),
            Some(Arc::new(FakeVideoSearch::failing())),
            None,
        );

        let request = cycle_request(json!({
            "subject": "Matematik",
            "performance_data": performance()
        }));
        let outcome = orchestrator.complete_learning_cycle(&request).await.unwrap();

        assert_eq!(outcome.status, AgentStatus::Error);
        let steps = &outcome.steps;
        for step in [&steps.analysis, &steps.book_recommendations, &steps.youtube_recommendations] {
            let step = step.as_ref().expect("step present");
            assert_eq!(step.status, AgentStatus::Error);
            assert!(step.error.is_some());
        }
        assert_eq!(outcome.execution_summary.failed, 3);
        assert!(!outcome.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_panicking_agent_does_not_disturb_sibling() {
        let orchestrator = Orchestrator::with_agents(
            Settings::default(),
            static_set(
                empty_books(),
                Arc::new(PanickingAgent(YOUTUBE_AGENT)),
                Arc::new(StaticAgent::success(ANALYSIS_AGENT, json!({}))),
            ),
            None,
        );

        let request = cycle_request(json!({"subject": "Fizik", "weak_topics": ["Kuvvet"]}));
        let outcome = orchestrator.complete_learning_cycle(&request).await.unwrap();

        let books = outcome.steps.book_recommendations.unwrap();
        let videos = outcome.steps.youtube_recommendations.unwrap();
        assert_eq!(books.status, AgentStatus::Success);
        assert_eq!(videos.status, AgentStatus::Error);
        assert!(videos.error.unwrap().contains("agent exploded"));
        assert_eq!(outcome.status, AgentStatus::Success);
    }

    #[tokio::test]
    async fn test_panicking_book_agent_leaves_videos_intact() {
        let orchestrator = Orchestrator::with_agents(
            Settings::default(),
            static_set(
                Arc::new(PanickingAgent(BOOK_AGENT)),
                empty_videos(),
                Arc::new(StaticAgent::success(ANALYSIS_AGENT, json!({}))),
            ),
            None,
        );

        let jobs: Vec<(Arc<dyn Agent>, AgentInput)> = vec![
            (Arc::new(PanickingAgent(BOOK_AGENT)), AgentInput::default()),
            (empty_videos(), AgentInput::default()),
        ];
        let outcome = orchestrator.fan_out(jobs).await;

        assert_eq!(outcome.results[BOOK_AGENT].status, AgentStatus::Error);
        assert_eq!(outcome.results[YOUTUBE_AGENT].status, AgentStatus::Success);
        assert_eq!(outcome.execution_summary.successful, 1);
        assert_eq!(outcome.execution_summary.failed, 1);
    }

    #[test]
    fn test_disabled_storage_opens_no_store() {
        let mut settings = Settings::default();
        settings.storage.enabled = false;
        assert!(open_store(&settings).unwrap().is_none());

        let dir = tempfile::tempdir().unwrap();
        settings.storage.enabled = true;
        settings.storage.sqlite_path = dir
            .path()
            .join("learning.db")
            .to_string_lossy()
            .into_owned();
        assert!(open_store(&settings).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_fan_out_has_one_slot_per_agent() {
        let orchestrator = Orchestrator::with_agents(
            Settings::default(),
            static_set(
                Arc::new(StaticAgent::failing(BOOK_AGENT, "boom")),
                Arc::new(PanickingAgent(YOUTUBE_AGENT)),
                Arc::new(StaticAgent::success(ANALYSIS_AGENT, json!({}))),
            ),
            None,
        );

        let jobs: Vec<(Arc<dyn Agent>, AgentInput)> = vec![
            (Arc::new(StaticAgent::failing(BOOK_AGENT, "boom")), AgentInput::default()),
            (Arc::new(PanickingAgent(YOUTUBE_AGENT)), AgentInput::default()),
            (Arc::new(StaticAgent::success(GENERAL_AGENT, json!({}))), AgentInput::default()),
        ];
        let outcome = orchestrator.fan_out(jobs).await;

        assert_eq!(outcome.results.len(), 3);
        assert_eq!(outcome.execution_summary.total_agents, 3);
        assert_eq!(outcome.execution_summary.failed, 2);
        assert_eq!(outcome.status, AgentStatus::Success);
    }

    #[tokio::test]
    async fn test_slow_agent_times_out() {
        let mut settings = Settings::default();
        settings.orchestrator.agent_timeout_secs = 1;
        let orchestrator = Orchestrator::with_agents(
            settings,
            static_set(
                Arc::new(StaticAgent::success(BOOK_AGENT, json!({}))),
                Arc::new(SlowAgent(YOUTUBE_AGENT, Duration::from_secs(30))),
                Arc::new(StaticAgent::success(ANALYSIS_AGENT, json!({}))),
            ),
            None,
        );

        let request = cycle_request(json!({"subject": "Kimya"}));
        let outcome = orchestrator.complete_learning_cycle(&request).await.unwrap();
        let videos = outcome.steps.youtube_recommendations.unwrap();
        assert_eq!(videos.status, AgentStatus::Error);
        assert!(videos.error.unwrap().contains("Timed out"));
        assert!(outcome.steps.book_recommendations.unwrap().is_success());
    }

    #[tokio::test]
    async fn test_analysis_topics_reach_recommenders() {
        let books = Arc::new(StaticAgent::success(
            BOOK_AGENT,
            json!({"recommendations": [], "total_found": 0}),
        ));
        let videos = Arc::new(StaticAgent::success(
            YOUTUBE_AGENT,
            json!({"videos": [], "total_found": 0}),
        ));
        let analysis = Arc::new(StaticAgent::success(
            ANALYSIS_AGENT,
            json!({"weak_topics": ["Kesirler", " Oran ", "Kesirler"], "weakness_level": 7}),
        ));
        let orchestrator = Orchestrator::with_agents(
            Settings::default(),
            static_set(books.clone(), videos.clone(), analysis.clone()),
            None,
        );

        let request = cycle_request(json!({
            "subject": "Matematik",
            "performance_data": performance()
        }));
        let outcome = orchestrator.complete_learning_cycle(&request).await.unwrap();

        assert_eq!(outcome.weak_topics, vec!["Kesirler", "Oran"]);
        assert_eq!(outcome.weak_topics_source, WeakTopicSource::Analysis);
        assert_eq!(outcome.weakness_level, Some(7));
        assert_eq!(analysis.inputs.lock().unwrap().len(), 1);

        for agent in [&books, &videos] {
            let inputs = agent.inputs.lock().unwrap();
            assert_eq!(inputs[0].weak_topics, outcome.weak_topics);
            assert_eq!(inputs[0].query.as_deref(), Some("Matematik Kesirler, Oran"));
        }
    }

    #[tokio::test]
    async fn test_known_weak_topics_skip_analysis() {
        let analysis = Arc::new(StaticAgent::success(
            ANALYSIS_AGENT,
            json!({"weak_topics": ["Oran"]}),
        ));
        let orchestrator = Orchestrator::with_agents(
            Settings::default(),
            static_set(
                Arc::new(StaticAgent::success(BOOK_AGENT, json!({}))),
                Arc::new(StaticAgent::success(YOUTUBE_AGENT, json!({}))),
                analysis.clone(),
            ),
            None,
        );

        let request = cycle_request(json!({
            "subject": "Matematik",
            "weak_topics": ["Kesirler", "Yüzde"],
            "performance_data": performance()
        }));
        let outcome = orchestrator.complete_learning_cycle(&request).await.unwrap();

        assert!(outcome.steps.analysis.is_none());
        assert!(analysis.inputs.lock().unwrap().is_empty());
        assert_eq!(outcome.weak_topics, vec!["Kesirler", "Yüzde"]);
        assert_eq!(outcome.weak_topics_source, WeakTopicSource::Request);
    }

    #[tokio::test]
    async fn test_subject_only_cycle_still_recommends() {
        let books = Arc::new(StaticAgent::success(BOOK_AGENT, json!({})));
        let orchestrator = Orchestrator::with_agents(
            Settings::default(),
            static_set(
                books.clone(),
                Arc::new(StaticAgent::success(YOUTUBE_AGENT, json!({}))),
                Arc::new(StaticAgent::success(ANALYSIS_AGENT, json!({}))),
            ),
            None,
        );

        let outcome = orchestrator
            .complete_learning_cycle(&cycle_request(json!({"subject": "Biyoloji"})))
            .await
            .unwrap();
        assert_eq!(outcome.weak_topics_source, WeakTopicSource::None);
        assert_eq!(books.inputs.lock().unwrap()[0].query.as_deref(), Some("Biyoloji"));
        assert!(outcome.steps.youtube_recommendations.is_some());

        let skipped = orchestrator
            .complete_learning_cycle(&cycle_request(json!({
                "subject": "Biyoloji",
                "skip_recommendations": true
            })))
            .await
            .unwrap();
        assert!(skipped.steps.book_recommendations.is_none());
        assert_eq!(skipped.execution_summary.total_agents, 0);
    }

    #[tokio::test]
    async fn test_failed_analysis_still_recommends() {
        let books = Arc::new(StaticAgent::success(BOOK_AGENT, json!({})));
        let orchestrator = Orchestrator::with_agents(
            Settings::default(),
            static_set(
                books.clone(),
                Arc::new(StaticAgent::success(YOUTUBE_AGENT, json!({}))),
                Arc::new(StaticAgent::failing(ANALYSIS_AGENT, "model down")),
            ),
            None,
        );

        let request = cycle_request(json!({
            "subject": "Matematik",
            "topic": "Kesirler",
            "performance_data": performance()
        }));
        let outcome = orchestrator.complete_learning_cycle(&request).await.unwrap();

        assert!(outcome.weak_topics.is_empty());
        assert_eq!(outcome.weak_topics_source, WeakTopicSource::None);
        assert_eq!(outcome.steps.analysis.unwrap().status, AgentStatus::Error);
        assert_eq!(outcome.status, AgentStatus::Success);
        assert!(outcome.warnings[0].contains("model down"));
        assert_eq!(books.inputs.lock().unwrap()[0].query.as_deref(), Some("Matematik"));
    }

    #[tokio::test]
    async fn test_cycle_is_persisted_for_user() {
        let store = Arc::new(MemoryStore::new());
        let llm = RoutingLlm::new(vec![
            (
                "learning coach",
                r#"{"weak_topics": ["Kesirler"], "weakness_level": 6, "summary": "ok"}"#,
            ),
            (
                "study books",
                r#"{"recommendations": [
                    {"title": "Kesirler Fasikülü", "url": "https://www.idefix.com/k"}
                ]}"#,
            ),
        ]);
        let orchestrator = Orchestrator::with_components(
            Settings::default(),
            Prompts::default(),
            Arc::new(llm),
            Some(Arc::new(FakeWebSearch::with_results(vec![web_hit(
                "Kesirler Fasikülü",
                "https://www.idefix.com/k",
                "89,90 TL",
            )]))),
            Some(Arc::new(FakeVideoSearch::with_results(vec![
                crate::testing::video("v1", "Kesirler"),
            ]))),
            Some(store.clone()),
        );

        let response = orchestrator
            .handle(AgentRequest::from_json(
                &json!({
                    "action": "complete_learning_cycle",
                    "subject": "Matematik",
                    "user_id": "student-1",
                    "performance_data": performance()
                })
                .to_string(),
            ).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), AgentStatus::Success);

        let recs = store.list_recommendations("student-1", 10).await.unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(store.list_sessions("student-1", 10).await.unwrap()[0].weakness_level, Some(6));
    }

    #[tokio::test]
    async fn test_handle_rejects_invalid_input_before_running() {
        let questions = Arc::new(StaticAgent::success(QUESTION_AGENT, json!({})));
        let mut agents = static_set(
            Arc::new(StaticAgent::success(BOOK_AGENT, json!({}))),
            Arc::new(StaticAgent::success(YOUTUBE_AGENT, json!({}))),
            Arc::new(StaticAgent::success(ANALYSIS_AGENT, json!({}))),
        );
        agents.questions = questions.clone();
        let orchestrator = Orchestrator::with_agents(Settings::default(), agents, None);

        let request =
            AgentRequest::from_json(r#"{"action": "generate_questions", "subject": "Fizik"}"#)
                .unwrap();
        let err = orchestrator.handle(request).await.unwrap_err();
        assert!(err.is_client_error());
        assert!(questions.inputs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_handle_single_agent_error_is_not_err() {
        let orchestrator = Orchestrator::with_components(
            Settings::default(),
            Prompts::default(),
            Arc::new(FailingLlm),
            None,
            None,
            None,
        );
        let request =
            AgentRequest::from_json(r#"{"action": "general_query", "query": "Türev nedir?"}"#)
                .unwrap();
        let response = orchestrator.handle(request).await.unwrap();
        assert_eq!(response.status(), AgentStatus::Error);
    }

    #[test]
    fn test_agents_info_lists_all() {
        let orchestrator = Orchestrator::with_components(
            Settings::default(),
            Prompts::default(),
            Arc::new(FailingLlm),
            None,
            None,
            None,
        );
        let names: Vec<_> = orchestrator.agents_info().into_iter().map(|a| a.name).collect();
        assert_eq!(
            names,
            vec![QUESTION_AGENT, ANALYSIS_AGENT, BOOK_AGENT, YOUTUBE_AGENT, GENERAL_AGENT]
        );
    }
}
