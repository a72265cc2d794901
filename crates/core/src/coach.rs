//! Course Coach
//!
//! Lessons can ask the user for a written answer. The coach fills the lesson's
//! prompt template with that answer and returns free-text coaching from the LLM.

use crate::llm_client::{LLMClient, ResponseShape};
use anyhow::{Result, bail};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

const COACH_SYSTEM_PROMPT: &str = "You are a supportive communication coach. \
Give concise, specific and encouraging feedback in plain text.";

/// The placeholder a lesson template uses for the user's answer.
const USER_RESPONSE_PLACEHOLDER: &str = "{userResponse}";

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CoachRequest {
    pub prompt_template: String,
    pub user_response: String,
    pub lesson_id: String,
}

/// Builds the coaching prompt. Templates without a placeholder get the
/// answer appended.
pub fn render_coach_prompt(prompt_template: &str, user_response: &str) -> String {
    if prompt_template.contains(USER_RESPONSE_PLACEHOLDER) {
        prompt_template.replace(USER_RESPONSE_PLACEHOLDER, user_response)
    } else {
        format!("{prompt_template}\n\nUser response:\n{user_response}")
    }
}

pub struct CourseCoach {
    llm: Arc<dyn LLMClient>,
}

impl CourseCoach {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }

    pub async fn coach(&self, request: &CoachRequest) -> Result<String> {
        if request.user_response.trim().is_empty() {
            bail!("user response is empty");
        }
        info!(lesson_id = %request.lesson_id, "Requesting course coaching");
        let prompt = render_coach_prompt(&request.prompt_template, &request.user_response);
        let feedback = self
            .llm
            .complete(COACH_SYSTEM_PROMPT, &prompt, ResponseShape::Text)
            .await?;
        Ok(feedback.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::MockLLMClient;

    #[test]
    fn placeholder_is_replaced() {
        assert_eq!(
            render_coach_prompt("Rate this intro: {userResponse}", "Hi, I'm Sam"),
            "Rate this intro: Hi, I'm Sam"
        );
    }

    #[test]
    fn answer_is_appended_without_placeholder() {
        assert_eq!(
            render_coach_prompt("Rate this intro.", "Hi"),
            "Rate this intro.\n\nUser response:\nHi"
        );
    }

    #[tokio::test]
    async fn coach_returns_trimmed_text() {
        let mut llm = MockLLMClient::new();
        llm.expect_complete()
            .withf(|_, prompt, shape| {
                prompt.contains("Hi, I'm Sam") && matches!(shape, ResponseShape::Text)
            })
            .returning(|_, _, _| Ok("  Nice and warm opener.\n".to_string()))
            .once();

        let coach = CourseCoach::new(Arc::new(llm));
        let feedback = coach
            .coach(&CoachRequest {
                prompt_template: "Rate: {userResponse}".to_string(),
                user_response: "Hi, I'm Sam".to_string(),
                lesson_id: "small-talk".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(feedback, "Nice and warm opener.");
    }

    #[tokio::test]
    async fn blank_answer_is_rejected_before_the_llm() {
        let mut llm = MockLLMClient::new();
        llm.expect_complete().never();

        let coach = CourseCoach::new(Arc::new(llm));
        let result = coach
            .coach(&CoachRequest {
                prompt_template: "Rate: {userResponse}".to_string(),
                user_response: "  ".to_string(),
                lesson_id: "small-talk".to_string(),
            })
            .await;
        assert!(result.is_err());
    }
}
