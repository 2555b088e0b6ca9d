//! Free-form tutoring questions.

use super::{finish, Agent, AgentContext, AgentInput, AgentResult, GENERAL_AGENT};
use crate::error::{Result, StudyflowError};
use crate::llm::CompletionRequest;
use async_trait::async_trait;
use serde::Serialize;
use tracing::instrument;

/// Output of the general agent.
#[derive(Debug, Serialize)]
pub struct GeneralAnswer {
    pub query: String,
    pub answer: String,
}

/// Answers free-form questions.
pub struct GeneralAgent {
    ctx: AgentContext,
}

impl GeneralAgent {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, input))]
    async fn answer(&self, input: &AgentInput) -> Result<GeneralAnswer> {
        let query = input
            .query()
            .ok_or_else(|| StudyflowError::InvalidInput("query is required".into()))?;

        let mut user = String::new();
        if let Some(subject) = input.subject() {
            user.push_str(&format!("Subject: {}\n", subject));
        }
        if let Some(context) = input.context.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            user.push_str(&format!("Context:\n{}\n\n", context));
        }
        user.push_str(query);

        let system = self.ctx.render(&self.ctx.prompts.general.system, input, &[]);
        let answer = self.ctx.llm.complete(&CompletionRequest::text(system, user)).await?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(StudyflowError::Agent("Model returned an empty answer".into()));
        }

        Ok(GeneralAnswer {
            query: query.to_string(),
            answer: answer.to_string(),
        })
    }
}

#[async_trait]
impl Agent for GeneralAgent {
    fn name(&self) -> &'static str {
        GENERAL_AGENT
    }

    fn description(&self) -> &'static str {
        "Answers free-form study questions"
    }

    async fn process(&self, input: &AgentInput) -> AgentResult {
        finish(GENERAL_AGENT, self.answer(input).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentStatus;
    use crate::testing::{context, FailingLlm, SequenceLlm};

    #[tokio::test]
    async fn test_answer_includes_context() {
        let llm = std::sync::Arc::new(SequenceLlm::new(vec![
            "  Pay ve payda aynı sayıyla bölünür.  ",
        ]));
        let ctx = AgentContext::new(llm.clone(), Default::default(), Default::default());
        let agent = GeneralAgent::new(ctx);

        let input = AgentInput {
            query: Some("Kesir nasıl sadeleştirilir?".into()),
            context: Some("8. sınıf".into()),
            ..Default::default()
        };
        let data = agent.process(&input).await.data.unwrap();
        assert_eq!(data["answer"], "Pay ve payda aynı sayıyla bölünür.");

        let requests = llm.requests.lock().unwrap();
        assert!(requests[0].user.contains("8. sınıf"));
        assert!(!requests[0].json);
    }

    #[tokio::test]
    async fn test_missing_query_is_error() {
        let agent = GeneralAgent::new(context(SequenceLlm::new(vec!["x"])));
        let result = agent.process(&AgentInput::default()).await;
        assert_eq!(result.status, AgentStatus::Error);
    }

    #[tokio::test]
    async fn test_provider_failure_is_error() {
        let agent = GeneralAgent::new(context(FailingLlm));
        let input = AgentInput {
            query: Some("?".into()),
            ..Default::default()
        };
        assert_eq!(agent.process(&input).await.status, AgentStatus::Error);
    }
}
