//! Questions command implementation.

use super::{ensure_ready, payload, str_field};
use crate::agents::Difficulty;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{AgentRequest, AgentResponse, Orchestrator, QuestionRequest};
use anyhow::{anyhow, Result};
use console::style;

/// Generate and print practice questions.
pub async fn run_questions(
    subject: &str,
    topic: &str,
    count: Option<usize>,
    difficulty: Option<&str>,
    settings: Settings,
) -> Result<()> {
    let difficulty = difficulty.map(parse_difficulty).transpose()?;
    ensure_ready(Operation::Agents, &settings)?;

    let orchestrator = Orchestrator::new(settings)?;
    let request = AgentRequest::GenerateQuestions(QuestionRequest {
        subject: subject.to_string(),
        topic: topic.to_string(),
        count,
        difficulty,
        ..Default::default()
    });

    let spinner = Output::spinner("Generating questions...");
    let response = orchestrator.handle(request).await;
    spinner.finish_and_clear();

    let AgentResponse::Agent(result) = response? else {
        return Err(anyhow!("Unexpected response for generate_questions"));
    };
    let data = payload(&result)?;

    Output::header(&format!("{} - {}", subject, topic));
    let questions = data["questions"].as_array().cloned().unwrap_or_default();
    for (i, q) in questions.iter().enumerate() {
        println!(
            "\n{} {}",
            style(format!("{}.", i + 1)).bold(),
            q["question"].as_str().unwrap_or_default()
        );
        for option in q["options"].as_array().into_iter().flatten() {
            println!("   {}", option.as_str().unwrap_or_default());
        }
        if let Some(answer) = str_field(q, "correct_answer") {
            Output::kv("Answer", answer);
        }
        if let Some(explanation) = str_field(q, "explanation") {
            Output::kv("Why", explanation);
        }
    }
    println!();

    if let Some(note) = str_field(data, "note") {
        Output::warning(note);
    }
    Output::success(&format!("{} questions generated", questions.len()));
    Ok(())
}

fn parse_difficulty(value: &str) -> Result<Difficulty> {
    serde_json::from_value(serde_json::Value::String(value.trim().to_lowercase()))
        .map_err(|_| anyhow!("Unknown difficulty '{}': use easy, medium or hard", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_difficulty() {
        assert_eq!(parse_difficulty("Hard").unwrap(), Difficulty::Hard);
        assert_eq!(parse_difficulty("kolay").unwrap(), Difficulty::Easy);
        assert!(parse_difficulty("extreme").is_err());
    }
}
