//! Bounded degrade path for structured LLM calls.
//!
//! A call moves through at most three tiers:
//! primary prompt -> simplified prompt -> static payload.
//! Only schema/parse failures advance to the next tier. Provider and network
//! errors end the chain immediately so the agent can report them.

use crate::error::{Result, StudyflowError};
use crate::llm::{complete_structured, CompletionRequest, LanguageModel};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Which tier produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Primary,
    Simplified,
    Static,
}

impl Tier {
    fn next(self) -> Option<Tier> {
        match self {
            Tier::Primary => Some(Tier::Simplified),
            Tier::Simplified => Some(Tier::Static),
            Tier::Static => None,
        }
    }
}

/// A value together with the tier that produced it.
#[derive(Debug)]
pub struct Degraded<T> {
    pub value: T,
    pub tier: Tier,
}

impl<T> Degraded<T> {
    /// Note to attach to a result produced below the primary tier.
    pub fn note(&self) -> Option<String> {
        match self.tier {
            Tier::Primary => None,
            Tier::Simplified => Some(
                "Produced with a simplified prompt after the first response could not be parsed"
                    .to_string(),
            ),
            Tier::Static => {
                Some("Model output could not be parsed; showing a fallback result".to_string())
            }
        }
    }
}

/// Three-tier structured completion.
pub struct FallbackChain<'a> {
    llm: &'a dyn LanguageModel,
    primary: CompletionRequest,
    simplified: Option<CompletionRequest>,
}

impl<'a> FallbackChain<'a> {
    pub fn new(llm: &'a dyn LanguageModel, primary: CompletionRequest) -> Self {
        Self {
            llm,
            primary,
            simplified: None,
        }
    }

    pub fn with_simplified(mut self, request: CompletionRequest) -> Self {
        self.simplified = Some(request);
        self
    }

    /// Run the chain, accepting any value that parses.
    pub async fn run<T, F>(self, fallback: F) -> Result<Degraded<T>>
    where
        T: DeserializeOwned,
        F: FnOnce() -> Option<T>,
    {
        self.run_checked(|_| true, fallback).await
    }

    /// Run the chain. A parsed value rejected by `accept` counts as a parse failure.
    pub async fn run_checked<T, A, F>(self, accept: A, fallback: F) -> Result<Degraded<T>>
    where
        T: DeserializeOwned,
        A: Fn(&T) -> bool,
        F: FnOnce() -> Option<T>,
    {
        let mut tier = Tier::Primary;
        let mut last_error: Option<StudyflowError> = None;

        loop {
            let request = match tier {
                Tier::Primary => Some(&self.primary),
                Tier::Simplified => self.simplified.as_ref(),
                Tier::Static => {
                    return match fallback() {
                        Some(value) => {
                            debug!("Using static fallback payload");
                            Ok(Degraded { value, tier })
                        }
                        None => Err(last_error.unwrap_or_else(|| {
                            StudyflowError::SchemaParse("No usable model output".to_string())
                        })),
                    };
                }
            };

            if let Some(request) = request {
                match complete_structured::<T>(self.llm, request).await {
                    Ok(value) if accept(&value) => return Ok(Degraded { value, tier }),
                    Ok(_) => {
                        warn!(?tier, "Model output failed validation");
                        last_error = Some(StudyflowError::SchemaParse(
                            "Model output was missing required content".to_string(),
                        ));
                    }
                    Err(e) if e.is_schema_error() => {
                        warn!(?tier, "Model output could not be parsed: {}", e);
                        last_error = Some(e);
                    }
                    Err(e) => return Err(e),
                }
            }

            match tier.next() {
                Some(next) => tier = next,
                None => unreachable!("static tier always returns"),
            }
        }
    }
}
