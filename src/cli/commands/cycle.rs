//! Cycle command - analysis followed by recommendations.

use super::{ensure_ready, payload, str_field};
use crate::agents::PerformanceData;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{LearningCycleOutcome, LearningCycleRequest, Orchestrator};
use anyhow::{bail, Result};
use console::style;

/// Arguments of the cycle command.
#[derive(Debug, Default)]
pub struct CycleArgs {
    pub subject: String,
    pub topic: Option<String>,
    pub total: Option<u32>,
    pub correct: Option<u32>,
    pub weak_topics: Vec<String>,
    pub user: Option<String>,
    pub json: bool,
}

impl CycleArgs {
    fn into_request(self) -> Result<LearningCycleRequest> {
        let performance_data = match (self.total, self.correct) {
            (Some(total), Some(correct)) => Some(PerformanceData {
                total_questions: total,
                correct_answers: correct,
                wrong_answers: Some(total.saturating_sub(correct)),
                ..Default::default()
            }),
            (None, None) => None,
            _ => bail!("--total and --correct must be given together"),
        };

        Ok(LearningCycleRequest {
            subject: self.subject,
            topic: self.topic,
            performance_data,
            weak_topics: self.weak_topics,
            user_id: self.user,
            ..Default::default()
        })
    }
}

/// Run a learning cycle and print the outcome.
pub async fn run_cycle(args: CycleArgs, settings: Settings) -> Result<()> {
    let json = args.json;
    let request = args.into_request()?;
    if let Some(perf) = &request.performance_data {
        perf.validate()?;
    }
    ensure_ready(Operation::Recommend, &settings)?;

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Analysing results and collecting recommendations...");
    let outcome = orchestrator.complete_learning_cycle(&request).await;
    spinner.finish_and_clear();
    let outcome = outcome?;

    if json {
        return Output::json(&outcome);
    }
    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &LearningCycleOutcome) {
    Output::header(&format!("Learning cycle: {}", outcome.subject));

    if let Some(analysis) = &outcome.steps.analysis {
        match payload(analysis) {
            Ok(data) => {
                if let Some(accuracy) = data["accuracy"].as_f64() {
                    Output::kv("Accuracy", &format!("{:.1}%", accuracy));
                }
                if let Some(summary) = str_field(data, "summary") {
                    Output::kv("Summary", summary);
                }
            }
            Err(e) => Output::warning(&e.to_string()),
        }
    }
    if let Some(level) = outcome.weakness_level {
        Output::kv("Weakness level", &format!("{}/10", level));
    }
    if outcome.weak_topics.is_empty() {
        Output::kv("Weak topics", "none identified");
    } else {
        Output::kv("Weak topics", &outcome.weak_topics.join(", "));
    }

    if let Some(books) = &outcome.steps.book_recommendations {
        Output::header("Books");
        match payload(books) {
            Ok(data) => {
                for book in data["recommendations"].as_array().into_iter().flatten() {
                    let detail = book["price"].as_f64().map(|p| format!("({:.2} TL)", p));
                    Output::recommendation(
                        str_field(book, "title").unwrap_or("untitled"),
                        detail.as_deref(),
                        str_field(book, "url"),
                    );
                }
                if let Some(note) = str_field(data, "note") {
                    println!("  {}", style(note).dim());
                }
            }
            Err(e) => Output::warning(&e.to_string()),
        }
    }

    if let Some(videos) = &outcome.steps.youtube_recommendations {
        Output::header("Videos");
        match payload(videos) {
            Ok(data) => {
                for video in data["videos"].as_array().into_iter().flatten() {
                    let detail = match (str_field(video, "channel"), str_field(video, "duration")) {
                        (Some(channel), Some(duration)) => {
                            Some(format!("{} [{}]", channel, duration))
                        }
                        (Some(channel), None) => Some(channel.to_string()),
                        _ => None,
                    };
                    Output::recommendation(
                        str_field(video, "title").unwrap_or("untitled"),
                        detail.as_deref(),
                        str_field(video, "url"),
                    );
                }
            }
            Err(e) => Output::warning(&e.to_string()),
        }
    }

    println!();
    for warning in &outcome.warnings {
        Output::warning(warning);
    }
    let summary = &outcome.execution_summary;
    Output::info(&format!(
        "{} of {} steps succeeded in {} ms",
        summary.successful, summary.total_agents, summary.elapsed_ms
    ));
}
