//! Performance analysis.

use super::fallback::FallbackChain;
use super::{finish, Agent, AgentContext, AgentInput, AgentResult, ANALYSIS_AGENT};
use crate::error::{Result, StudyflowError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Per-topic exam results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicResult {
    pub topic: String,
    pub total: u32,
    pub correct: u32,
}

impl TopicResult {
    fn accuracy(&self) -> Option<f64> {
        (self.total > 0).then(|| self.correct as f64 / self.total as f64)
    }
}

/// Exam results submitted for analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceData {
    #[serde(alias = "total_questions")]
    pub total_questions: u32,
    #[serde(alias = "correct_answers")]
    pub correct_answers: u32,
    #[serde(default, alias = "wrong_answers")]
    pub wrong_answers: Option<u32>,
    #[serde(default, alias = "empty_answers")]
    pub empty_answers: Option<u32>,
    /// Seconds spent on the exam.
    #[serde(default, alias = "time_spent")]
    pub time_spent: Option<u64>,
    #[serde(default, alias = "topic_results")]
    pub topic_results: Vec<TopicResult>,
}

impl PerformanceData {
    /// Reject results whose counts cannot be right.
    pub fn validate(&self) -> Result<()> {
        if self.total_questions == 0 {
            return Err(StudyflowError::InvalidInput(
                "performance_data.totalQuestions must be greater than zero".into(),
            ));
        }
        let answered = self.correct_answers as u64
            + self.wrong_answers.unwrap_or(0) as u64
            + self.empty_answers.unwrap_or(0) as u64;
        if answered > self.total_questions as u64 {
            return Err(StudyflowError::InvalidInput(format!(
                "performance_data answers ({}) exceed totalQuestions ({})",
                answered, self.total_questions
            )));
        }
        if let Some(t) = self.topic_results.iter().find(|t| t.correct > t.total) {
            return Err(StudyflowError::InvalidInput(format!(
                "topic '{}' has more correct answers than questions",
                t.topic
            )));
        }
        Ok(())
    }

    /// Fraction of questions answered correctly.
    pub fn accuracy(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        self.correct_answers as f64 / self.total_questions as f64
    }

    /// Topics answered below `threshold`, weakest first.
    pub fn weak_topics_below(&self, threshold: f64) -> Vec<String> {
        let mut weak: Vec<(&TopicResult, f64)> = self
            .topic_results
            .iter()
            .filter_map(|t| t.accuracy().map(|acc| (t, acc)))
            .filter(|(_, acc)| *acc < threshold)
            .collect();
        weak.sort_by(|a, b| a.1.total_cmp(&b.1));
        weak.into_iter().map(|(t, _)| t.topic.trim().to_string()).collect()
    }

    fn describe(&self) -> String {
        let mut lines = vec![format!(
            "Total: {}, correct: {}, wrong: {}, empty: {}",
            self.total_questions,
            self.correct_answers,
            self.wrong_answers
                .map(|w| w.to_string())
                .unwrap_or_else(|| "?".into()),
            self.empty_answers
                .map(|e| e.to_string())
                .unwrap_or_else(|| "?".into()),
        )];
        if let Some(secs) = self.time_spent {
            lines.push(format!("Time spent: {} min {} s", secs / 60, secs % 60));
        }
        for t in &self.topic_results {
            lines.push(format!("- {}: {}/{} correct", t.topic, t.correct, t.total));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Default, Deserialize)]
struct ModelAnalysis {
    #[serde(default)]
    weak_topics: Vec<String>,
    #[serde(default)]
    strong_topics: Vec<String>,
    #[serde(default)]
    weakness_level: Option<f64>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default)]
    study_plan: Vec<String>,
}

/// Output of the analysis agent.
#[derive(Debug, Serialize)]
pub struct PerformanceAnalysis {
    pub subject: Option<String>,
    pub topic: Option<String>,
    /// Percentage, one decimal.
    pub accuracy: f64,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub weak_topics: Vec<String>,
    pub strong_topics: Vec<String>,
    /// 0 (none) to 10 (severe).
    pub weakness_level: u8,
    pub summary: String,
    pub recommendations: Vec<String>,
    pub study_plan: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// The part of an analysis the learning cycle consumes.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct WeaknessSnapshot {
    #[serde(default)]
    pub weak_topics: Vec<String>,
    #[serde(default)]
    pub weakness_level: Option<u8>,
}

impl WeaknessSnapshot {
    /// Read the snapshot from a successful analysis result.
    pub fn from_result(result: &AgentResult) -> Option<Self> {
        if !result.is_success() {
            return None;
        }
        result
            .data
            .as_ref()
            .and_then(|data| serde_json::from_value(data.clone()).ok())
    }
}

fn clamp_level(level: f64) -> u8 {
    if level.is_nan() {
        return 0;
    }
    level.clamp(0.0, 10.0).round() as u8
}

fn dedup_trimmed(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim();
        if !item.is_empty() && !out.iter().any(|seen| seen == item) {
            out.push(item.to_string());
        }
    }
    out
}

/// Statistics-only analysis, used when the model output is unusable.
fn local_analysis(
    perf: &PerformanceData,
    threshold: f64,
    fallback_topic: Option<&str>,
) -> ModelAnalysis {
    let accuracy = perf.accuracy();
    let mut weak_topics = perf.weak_topics_below(threshold);
    if weak_topics.is_empty() && accuracy < threshold {
        weak_topics.extend(fallback_topic.map(str::to_string));
    }
    let strong_topics: Vec<String> = perf
        .topic_results
        .iter()
        .filter(|t| t.accuracy().is_some_and(|acc| acc >= 0.8))
        .map(|t| t.topic.clone())
        .collect();

    ModelAnalysis {
        recommendations: weak_topics
            .iter()
            .map(|t| format!("Review {} and solve practice questions", t))
            .collect(),
        weak_topics,
        strong_topics,
        weakness_level: Some((1.0 - accuracy) * 10.0),
        summary: Some(format!(
            "{} of {} questions answered correctly ({:.0}%).",
            perf.correct_answers,
            perf.total_questions,
            accuracy * 100.0
        )),
        study_plan: Vec::new(),
    }
}

/// Analyses exam results and identifies weak topics.
pub struct AnalysisAgent {
    ctx: AgentContext,
}

impl AnalysisAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, input), fields(subject = ?input.subject))]
    async fn analyze(&self, input: &AgentInput) -> Result<PerformanceAnalysis> {
        let perf = input
            .performance
            .as_ref()
            .ok_or_else(|| StudyflowError::InvalidInput("performance_data is required".into()))?;
        perf.validate()?;

        let threshold = self.ctx.settings.orchestrator.weak_topic_threshold;
        let accuracy = perf.accuracy();
        let extra = [
            ("performance", perf.describe()),
            ("accuracy", format!("{:.0}", accuracy * 100.0)),
        ];
        let prompts = &self.ctx.prompts.analysis;
        let local_topic = input.topic().or(input.subject());

        let outcome = FallbackChain::new(
            self.ctx.llm.as_ref(),
            self.ctx.json_request(&prompts.system, &prompts.user, input, &extra),
        )
        .with_simplified(self.ctx.json_request(&prompts.system, &prompts.simplified, input, &extra))
        .run(|| Some(local_analysis(perf, threshold, local_topic)))
        .await?;

        let note = outcome.note();
        let model = outcome.value;
        let local = local_analysis(perf, threshold, local_topic);

        let weak_topics = match dedup_trimmed(model.weak_topics) {
            topics if topics.is_empty() => local.weak_topics,
            topics => topics,
        };

        Ok(PerformanceAnalysis {
            subject: input.subject().map(str::to_string),
            topic: input.topic().map(str::to_string),
            accuracy: (accuracy * 1000.0).round() / 10.0,
            total_questions: perf.total_questions,
            correct_answers: perf.correct_answers,
            weak_topics,
            strong_topics: dedup_trimmed(model.strong_topics),
            weakness_level: clamp_level(
                model
                    .weakness_level
                    .or(local.weakness_level)
                    .unwrap_or_default(),
            ),
            summary: model.summary.or(local.summary).unwrap_or_default(),
            recommendations: model.recommendations,
            study_plan: model.study_plan,
            note,
        })
    }
}

#[async_trait]
impl Agent for AnalysisAgent {
    fn name(&self) -> &'static str {
        ANALYSIS_AGENT
    }

    fn description(&self) -> &'static str {
        "Analyses exam results, identifies weak topics and rates weakness from 0 to 10"
    }

    async fn process(&self, input: &AgentInput) -> AgentResult {
        finish(ANALYSIS_AGENT, self.analyze(input).await)
    }
}
