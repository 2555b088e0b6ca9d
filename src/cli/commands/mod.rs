//! CLI command implementations.

mod config;
mod cycle;
mod doctor;
mod history;
mod questions;
mod run;
mod serve;

pub use config::run_config;
pub use cycle::{run_cycle, CycleArgs};
pub use doctor::run_doctor;
pub use history::run_history;
pub use questions::run_questions;
pub use run::run_request;
pub use serve::run_serve;

use crate::agents::AgentResult;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;

/// Run pre-flight checks, pointing the user at `doctor` on failure.
fn ensure_ready(operation: Operation, settings: &Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(operation, settings) {
        Output::error(&e.to_string());
        Output::info("Run 'studyflow doctor' for detailed diagnostics.");
        return Err(e.into());
    }
    Ok(())
}

/// Payload of a successful agent result, or the agent's error.
fn payload(result: &AgentResult) -> anyhow::Result<&serde_json::Value> {
    match (&result.data, &result.error) {
        (Some(data), None) => Ok(data),
        (_, Some(error)) => Err(anyhow::anyhow!("{} failed: {}", result.agent, error)),
        (None, None) => Err(anyhow::anyhow!("{} returned no data", result.agent)),
    }
}

fn str_field<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
}
