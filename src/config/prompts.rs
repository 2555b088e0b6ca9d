//! Prompt templates for Studyflow agents.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory
//! (`questions.toml`, `analysis.toml`, `books.toml`, `videos.toml`, `general.toml`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub questions: QuestionPrompts,
    pub analysis: AnalysisPrompts,
    pub books: BookPrompts,
    pub videos: VideoPrompts,
    pub general: GeneralPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for question generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionPrompts {
    pub system: String,
    pub user: String,
    /// Shorter prompt used when the first answer could not be parsed.
    pub simplified: String,
}

impl Default for QuestionPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an experienced exam question writer for {{education_level}} students.
Write clear multiple-choice questions in {{language}}.

Rules:
- Every question has exactly 4 options
- Exactly one option is correct and "correct_answer" repeats it verbatim
- Explanations are one or two sentences
- Never repeat a question listed under "Already used"

Respond only with JSON."#
                .to_string(),

            user: r#"Subject: {{subject}}
Topic: {{topic}}
Difficulty: {{difficulty}}
Number of questions: {{count}}

Already used (do not repeat):
{{excluded}}

Return JSON: {"questions": [{"question": "...", "options": ["...", "...", "...", "..."], "correct_answer": "...", "explanation": "...", "difficulty": "{{difficulty}}"}]}"#
                .to_string(),

            simplified: r#"Write {{count}} multiple-choice questions about {{topic}} ({{subject}}) in {{language}}.
Return only this JSON shape: {"questions": [{"question": "", "options": ["", "", "", ""], "correct_answer": ""}]}"#
                .to_string(),
        }
    }
}

/// Prompts for performance analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisPrompts {
    pub system: String,
    pub user: String,
    pub simplified: String,
}

impl Default for AnalysisPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a learning coach analysing exam results of a {{education_level}} student.
Identify the topics the student is weak in, rate overall weakness from 0 (none) to 10 (severe),
and suggest concrete next steps. Answer in {{language}}. Respond only with JSON."#
                .to_string(),

            user: r#"Subject: {{subject}}
Topic: {{topic}}

Results:
{{performance}}

Return JSON:
{"weak_topics": ["..."], "strong_topics": ["..."], "weakness_level": 0, "summary": "...", "recommendations": ["..."], "study_plan": ["..."]}"#
                .to_string(),

            simplified: r#"A student scored {{accuracy}}% in {{subject}} ({{topic}}).
Return only JSON: {"weak_topics": ["..."], "weakness_level": 0, "summary": "..."}"#
                .to_string(),
        }
    }
}

/// Prompts for book recommendations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookPrompts {
    pub system: String,
    pub user: String,
    pub simplified: String,
}

impl Default for BookPrompts {
    fn default() -> Self {
        Self {
            system: r#"You recommend study books and question banks for {{education_level}} students.
Prefer books that are currently sold and match the student's weak topics.
Use only books that appear in the search results when they are provided.
Answer in {{language}}. Respond only with JSON."#
                .to_string(),

            user: r#"Weak topics: {{topics}}
Subject: {{subject}}
Recommend up to {{max_results}} books.

Search results:
{{search_results}}

Return JSON: {"recommendations": [{"title": "...", "author": "...", "publisher": "...", "description": "...", "url": "...", "price": "..."}]}"#
                .to_string(),

            simplified: r#"Name up to {{max_results}} well-known study books for {{topics}} ({{subject}}, {{education_level}}).
Return only JSON: {"recommendations": [{"title": "", "author": "", "description": ""}]}"#
                .to_string(),
        }
    }
}

/// Prompts for video recommendations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoPrompts {
    /// System prompt used when the video search API is unavailable.
    pub system: String,
    pub user: String,
    pub simplified: String,
}

impl Default for VideoPrompts {
    fn default() -> Self {
        Self {
            system: r#"You know the educational YouTube landscape for {{education_level}} students.
Suggest well-known channels and lesson titles that cover the requested topics.
Do not invent video links. Answer in {{language}}. Respond only with JSON."#
                .to_string(),

            user: r#"Topics: {{topics}}
Subject: {{subject}}
Suggest {{max_results}} videos.

Return JSON: {"videos": [{"title": "...", "channel": "...", "description": "...", "search_query": "..."}]}"#
                .to_string(),

            simplified: r#"List {{max_results}} YouTube lesson titles with channel names for {{topics}}.
Return only JSON: {"videos": [{"title": "", "channel": ""}]}"#
                .to_string(),
        }
    }
}

/// Prompts for free-form questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralPrompts {
    pub system: String,
}

impl Default for GeneralPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a patient tutor for {{education_level}} students.
Answer in {{language}}. Explain step by step and keep answers focused on the question."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            if let Some(p) = load_section(&custom_path, "questions.toml")? {
                prompts.questions = p;
            }
            if let Some(p) = load_section(&custom_path, "analysis.toml")? {
                prompts.analysis = p;
            }
            if let Some(p) = load_section(&custom_path, "books.toml")? {
                prompts.books = p;
            }
            if let Some(p) = load_section(&custom_path, "videos.toml")? {
                prompts.videos = p;
            }
            if let Some(p) = load_section(&custom_path, "general.toml")? {
                prompts.general = p;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

fn load_section<T: serde::de::DeserializeOwned>(
    dir: &std::path::Path,
    file: &str,
) -> crate::error::Result<Option<T>> {
    let path = dir.join(file);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)?;
    Ok(Some(toml::from_str(&content)?))
}
