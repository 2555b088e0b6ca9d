//! Incoming requests, tagged by `action`.

use crate::agents::{AgentInput, Difficulty, PerformanceData};
use crate::error::{Result, StudyflowError};
use serde::{Deserialize, Serialize};

/// A request dispatched by the orchestrator.
///
/// ```json
/// {"action": "complete_learning_cycle", "subject": "Matematik", "performance_data": {...}}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AgentRequest {
    GenerateQuestions(QuestionRequest),
    AnalyzePerformance(AnalysisRequest),
    RecommendYoutube(RecommendationRequest),
    RecommendBooks(RecommendationRequest),
    CompleteLearningCycle(LearningCycleRequest),
    GeneralQuery(GeneralQueryRequest),
}

/// All action names, in dispatch order.
pub const ACTIONS: [&str; 6] = [
    "generate_questions",
    "analyze_performance",
    "recommend_youtube",
    "recommend_books",
    "complete_learning_cycle",
    "general_query",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionRequest {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default, alias = "educationLevel")]
    pub education_level: Option<String>,
    /// Previously asked questions that must not be repeated.
    #[serde(default, alias = "excludeQuestions", alias = "exclude_questions")]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default, alias = "performanceData")]
    pub performance_data: Option<PerformanceData>,
    #[serde(default, alias = "educationLevel")]
    pub education_level: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationRequest {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default, alias = "weakTopics")]
    pub weak_topics: Vec<String>,
    #[serde(default, alias = "educationLevel")]
    pub education_level: Option<String>,
    #[serde(default, alias = "maxResults")]
    pub max_results: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearningCycleRequest {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default, alias = "performanceData")]
    pub performance_data: Option<PerformanceData>,
    #[serde(default, alias = "weakTopics")]
    pub weak_topics: Vec<String>,
    #[serde(default, alias = "educationLevel")]
    pub education_level: Option<String>,
    /// Results are persisted for this user when set.
    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,
    /// Run only the analysis step.
    #[serde(default)]
    pub skip_recommendations: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralQueryRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default, alias = "educationLevel")]
    pub education_level: Option<String>,
}

fn require(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(StudyflowError::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}

impl AgentRequest {
    /// The `action` tag of this request.
    pub fn action(&self) -> &'static str {
        match self {
            AgentRequest::GenerateQuestions(_) => ACTIONS[0],
            AgentRequest::AnalyzePerformance(_) => ACTIONS[1],
            AgentRequest::RecommendYoutube(_) => ACTIONS[2],
            AgentRequest::RecommendBooks(_) => ACTIONS[3],
            AgentRequest::CompleteLearningCycle(_) => ACTIONS[4],
            AgentRequest::GeneralQuery(_) => ACTIONS[5],
        }
    }

    /// Check required fields before any agent runs.
    pub fn validate(&self) -> Result<()> {
        match self {
            AgentRequest::GenerateQuestions(r) => {
                require(&r.subject, "subject")?;
                require(&r.topic, "topic")?;
                if r.count == Some(0) {
                    return Err(StudyflowError::InvalidInput("count must be at least 1".into()));
                }
                Ok(())
            }
            AgentRequest::AnalyzePerformance(r) => r
                .performance_data
                .as_ref()
                .ok_or_else(|| StudyflowError::InvalidInput("performance_data is required".into()))?
                .validate(),
            AgentRequest::RecommendYoutube(_) | AgentRequest::RecommendBooks(_) => Ok(()),
            AgentRequest::CompleteLearningCycle(r) => {
                require(&r.subject, "subject")?;
                match &r.performance_data {
                    Some(perf) => perf.validate(),
                    None => Ok(()),
                }
            }
            AgentRequest::GeneralQuery(r) => require(&r.query, "query"),
        }
    }

    /// Parse a request from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(invalid_request)
    }

    /// Parse a request from an already decoded JSON body.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(invalid_request)
    }
}

fn invalid_request(e: serde_json::Error) -> StudyflowError {
    StudyflowError::InvalidInput(format!("Invalid request: {}", e))
}

impl From<&QuestionRequest> for AgentInput {
    fn from(r: &QuestionRequest) -> Self {
        AgentInput {
            subject: Some(r.subject.clone()),
            topic: Some(r.topic.clone()),
            education_level: r.education_level.clone(),
            count: r.count,
            difficulty: r.difficulty,
            exclude: r.exclude.clone(),
            ..Default::default()
        }
    }
}

impl From<&AnalysisRequest> for AgentInput {
    fn from(r: &AnalysisRequest) -> Self {
        AgentInput {
            subject: r.subject.clone(),
            topic: r.topic.clone(),
            performance: r.performance_data.clone(),
            education_level: r.education_level.clone(),
            ..Default::default()
        }
    }
}

impl From<&RecommendationRequest> for AgentInput {
    fn from(r: &RecommendationRequest) -> Self {
        AgentInput {
            subject: r.subject.clone(),
            topic: r.topic.clone(),
            weak_topics: r.weak_topics.clone(),
            education_level: r.education_level.clone(),
            max_results: r.max_results,
            ..Default::default()
        }
    }
}

impl From<&GeneralQueryRequest> for AgentInput {
    fn from(r: &GeneralQueryRequest) -> Self {
        AgentInput {
            subject: r.subject.clone(),
            query: Some(r.query.clone()),
            context: r.context.clone(),
            education_level: r.education_level.clone(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_learning_cycle() {
        let request = AgentRequest::from_json(
            r#"{
                "action": "complete_learning_cycle",
                "subject": "Matematik",
                "weakTopics": ["Kesirler"],
                "performance_data": {
                    "totalQuestions": 10,
                    "correctAnswers": 4,
                    "topicResults": [{"topic": "Kesirler", "total": 10, "correct": 4}]
                }
            }"#,
        )
        .unwrap();

        assert_eq!(request.action(), "complete_learning_cycle");
        let AgentRequest::CompleteLearningCycle(cycle) = &request else {
            panic!("wrong variant");
        };
        assert_eq!(cycle.weak_topics, vec!["Kesirler"]);
        assert_eq!(cycle.performance_data.as_ref().unwrap().total_questions, 10);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_unknown_action_is_invalid_input() {
        let err = AgentRequest::from_json(r#"{"action": "dance"}"#).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_validate_required_fields() {
        let request =
            AgentRequest::from_json(r#"{"action": "generate_questions", "subject": "Fizik"}"#)
                .unwrap();
        assert!(matches!(
            request.validate(),
            Err(StudyflowError::InvalidInput(m)) if m.contains("topic")
        ));

        let request = AgentRequest::from_json(r#"{"action": "analyze_performance"}"#).unwrap();
        assert!(request.validate().is_err());

        let request = AgentRequest::from_json(r#"{"action": "recommend_books"}"#).unwrap();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_action_names_roundtrip() {
        let request = AgentRequest::GeneralQuery(GeneralQueryRequest {
            query: "?".into(),
            ..Default::default()
        });
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["action"], request.action());
    }
}
