//! Run command - dispatch a raw request.

use super::ensure_ready;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{AgentRequest, Orchestrator};
use anyhow::{Context, Result};

/// Run a JSON request given inline or as `@path`.
pub async fn run_request(request: &str, settings: Settings) -> Result<()> {
    let text = read_request(request)?;
    let request = AgentRequest::from_json(&text)?;
    ensure_ready(Operation::Recommend, &settings)?;

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner(&format!("Running {}...", request.action()));
    let response = orchestrator.handle(request).await;
    spinner.finish_and_clear();

    Output::json(&response?)
}

fn read_request(arg: &str) -> Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => {
            let path = Settings::expand_path(path);
            std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read request file {:?}", path))
        }
        None => Ok(arg.to_string()),
    }
}
