//! Multiple-choice question generation.

use super::fallback::{FallbackChain, Tier};
use super::{finish, Agent, AgentContext, AgentInput, AgentResult, QUESTION_AGENT};
use crate::error::{Result, StudyflowError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, instrument, warn};

/// Requested question difficulty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[serde(alias = "kolay")]
    Easy,
    #[default]
    #[serde(alias = "orta")]
    Medium,
    #[serde(alias = "zor")]
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        };
        f.write_str(s)
    }
}

/// A generated question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

impl Question {
    fn is_usable(&self) -> bool {
        !self.question.trim().is_empty()
            && self.options.len() >= 2
            && !self.correct_answer.trim().is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct QuestionBatch {
    #[serde(default)]
    questions: Vec<Question>,
}

/// Output of the question agent.
#[derive(Debug, Serialize)]
pub struct QuestionSet {
    pub subject: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub requested: usize,
    pub generated: usize,
    pub questions: Vec<Question>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Normalized form used to detect duplicate questions.
pub fn normalize_question(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| c.is_ascii_punctuation()))
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Generates multiple-choice questions, never repeating an excluded question.
pub struct QuestionAgent {
    ctx: AgentContext,
}

impl QuestionAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, input), fields(subject = ?input.subject, topic = ?input.topic))]
    async fn generate(&self, input: &AgentInput) -> Result<QuestionSet> {
        let subject = input
            .subject()
            .ok_or_else(|| StudyflowError::InvalidInput("subject is required".into()))?;
        let topic = input
            .topic()
            .ok_or_else(|| StudyflowError::InvalidInput("topic is required".into()))?;

        let settings = &self.ctx.settings.questions;
        let requested = input
            .count
            .unwrap_or(settings.default_count)
            .clamp(1, settings.max_count.max(1));
        let difficulty = input.difficulty.unwrap_or_default();

        let mut seen: HashSet<String> =
            input.exclude.iter().map(|q| normalize_question(q)).collect();
        let mut questions: Vec<Question> = Vec::with_capacity(requested);
        let mut note = None;

        for round in 0..settings.max_rounds.max(1) {
            let remaining = requested - questions.len();
            if remaining == 0 {
                break;
            }

            let excluded = excluded_list(&input.exclude, &questions);
            let extra = [
                ("difficulty", difficulty.to_string()),
                ("count", remaining.to_string()),
                ("excluded", excluded),
            ];
            let prompts = &self.ctx.prompts.questions;
            let chain = FallbackChain::new(
                self.ctx.llm.as_ref(),
                self.ctx.json_request(&prompts.system, &prompts.user, input, &extra),
            )
            .with_simplified(self.ctx.json_request(
                &prompts.system,
                &prompts.simplified,
                input,
                &extra,
            ));

            let batch = chain
                .run_checked(
                    |b: &QuestionBatch| b.questions.iter().any(Question::is_usable),
                    || None,
                )
                .await;

            match batch {
                Ok(batch) => {
                    if batch.tier != Tier::Primary {
                        note = batch.note();
                    }
                    let added =
                        merge_unique(&mut questions, &mut seen, batch.value.questions, remaining);
                    debug!(round, added, "Question round finished");
                }
                Err(e) if questions.is_empty() => return Err(e),
                Err(e) => {
                    warn!("Stopping question generation early: {}", e);
                    break;
                }
            }
        }

        if questions.is_empty() {
            return Err(StudyflowError::Agent(
                "Model returned only duplicate or excluded questions".into(),
            ));
        }

        if questions.len() < requested {
            note = Some(format!(
                "Generated {} of {} requested questions",
                questions.len(),
                requested
            ));
        }

        Ok(QuestionSet {
            subject: subject.to_string(),
            topic: topic.to_string(),
            difficulty,
            requested,
            generated: questions.len(),
            questions,
            note,
        })
    }
}

fn excluded_list(exclude: &[String], generated: &[Question]) -> String {
    let lines: Vec<String> = exclude
        .iter()
        .map(String::as_str)
        .chain(generated.iter().map(|q| q.question.as_str()))
        .map(|q| format!("- {}", q.trim()))
        .collect();
    if lines.is_empty() {
        "(none)".to_string()
    } else {
        lines.join("\n")
    }
}

/// Append usable questions not seen before, up to `limit`. Returns how many were added.
fn merge_unique(
    into: &mut Vec<Question>,
    seen: &mut HashSet<String>,
    candidates: Vec<Question>,
    limit: usize,
) -> usize {
    let before = into.len();
    for question in candidates {
        if into.len() - before >= limit {
            break;
        }
        if !question.is_usable() {
            continue;
        }
        if seen.insert(normalize_question(&question.question)) {
            into.push(question);
        }
    }
    into.len() - before
}

#[async_trait]
impl Agent for QuestionAgent {
    fn name(&self) -> &'static str {
        QUESTION_AGENT
    }

    fn description(&self) -> &'static str {
        "Generates multiple-choice practice questions for a subject and topic"
    }

    async fn process(&self, input: &AgentInput) -> AgentResult {
        finish(QUESTION_AGENT, self.generate(input).await)
    }
}
