//! Pre-flight checks before expensive operations.
//!
//! Validates that required keys are available before starting operations
//! that would otherwise fail on the first provider call.

use crate::config::Settings;
use crate::error::{Result, StudyflowError};
use tracing::warn;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Any agent call needs the model key.
    Agents,
    /// Recommendations additionally benefit from search keys.
    Recommend,
    /// Reading history needs nothing external.
    History,
}

/// Run pre-flight checks for the given operation.
///
/// Missing search keys only warn; the agents fall back without them.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Agents => check_llm_key(settings)?,
        Operation::Recommend => {
            check_llm_key(settings)?;
            if settings.search_api_key().is_none() {
                warn!("TAVILY_API_KEY not set, book recommendations rely on the model alone");
            }
            if settings.youtube_api_key().is_none() {
                warn!("YOUTUBE_API_KEY not set, videos will be suggested as search links");
            }
        }
        Operation::History => {}
    }
    Ok(())
}

fn check_llm_key(settings: &Settings) -> Result<()> {
    if settings.llm_api_key().is_some() {
        return Ok(());
    }
    let var = &settings.llm.api_key_env;
    Err(StudyflowError::Config(format!(
        "{} not set. Set it with: export {}='...' or llm.api_key in the config file",
        var, var
    )))
}
