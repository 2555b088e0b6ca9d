//! Configuration module for Studyflow.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{
    AnalysisPrompts, BookPrompts, GeneralPrompts, Prompts, QuestionPrompts, VideoPrompts,
};
pub use settings::{
    BookSettings, GeneralSettings, LlmSettings, OrchestratorSettings, PromptSettings,
    QuestionSettings, SearchSettings, ServerSettings, Settings, StorageSettings, YoutubeSettings,
};
