//! Studyflow - AI study assistant
//!
//! A set of cooperating agents that support exam preparation.
//!
//! # Overview
//!
//! Studyflow can:
//! - Generate multiple-choice practice questions for a subject and topic
//! - Analyse exam results and find weak topics
//! - Recommend question books (with prices) and lecture videos for those topics
//! - Answer free-form study questions
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `llm` - Chat-completion client and structured-output parsing
//! - `search` - Web (Tavily) and YouTube search clients
//! - `agents` - The single-purpose agents and their fallback chain
//! - `orchestrator` - Request dispatch and the learning cycle
//! - `store` - Persistence of learning sessions and recommendations
//!
//! # Example
//!
//! ```rust,no_run
//! use studyflow::config::Settings;
//! use studyflow::orchestrator::{LearningCycleRequest, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let orchestrator = Orchestrator::new(Settings::load()?)?;
//!
//!     let request = LearningCycleRequest {
//!         subject: "Matematik".into(),
//!         weak_topics: vec!["Kesirler".into()],
//!         ..Default::default()
//!     };
//!     let outcome = orchestrator.complete_learning_cycle(&request).await?;
//!     println!("Weak topics: {:?}", outcome.weak_topics);
//!
//!     Ok(())
//! }
//! ```

pub mod agents;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod search;
pub mod store;

#[cfg(test)]
mod testing;

pub use error::{Result, StudyflowError};
