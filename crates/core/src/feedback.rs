//! Feedback Generation
//!
//! Turns a finished practice transcript into structured feedback: the
//! transcript and scenario are rendered into a fixed prompt, sent to the LLM,
//! and the response is parsed strictly into [`Feedback`].

use crate::{
    conversation::{Message, render_transcript},
    llm_client::{LLMClient, ResponseShape},
};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tracing::{error, info};
use utoipa::ToSchema;

/// The user-facing message for any feedback failure.
pub const FEEDBACK_FAILED_MESSAGE: &str = "Failed to generate feedback";

pub const FEEDBACK_SYSTEM_PROMPT: &str = "You are an expert communication coach. \
You evaluate practice conversations and answer ONLY with a JSON object of the form \
{\"perception\": string, \"strongPoints\": string[], \"improvementAreas\": string[]}. \
Do not include any other keys or any text outside the JSON object.";

#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("The transcript is empty")]
    EmptyTranscript,
    #[error("LLM request failed: {0}")]
    Llm(#[source] anyhow::Error),
    #[error("LLM response is not valid feedback JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Feedback request timed out after {0:?}")]
    Timeout(Duration),
}

/// Structured assessment of a completed practice transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Feedback {
    /// How the user likely came across to the other party.
    pub perception: String,
    pub strong_points: Vec<String>,
    pub improvement_areas: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub messages: Vec<Message>,
    pub context: String,
    pub user_goal: String,
    pub ai_role: String,
}

/// Renders the fixed feedback prompt for a transcript.
pub fn render_prompt(request: &FeedbackRequest) -> String {
    format!(
        "Analyze the following practice conversation.\n\n\
         Scenario context: {context}\n\
         The user's goal: {user_goal}\n\
         The AI partner's role: {ai_role}\n\n\
         Transcript:\n{transcript}\n\n\
         Evaluate only the USER's side of the conversation. Describe how the user was \
         perceived, list what they did well, and list concrete areas to improve. \
         Respond with JSON: {{\"perception\": \"...\", \"strongPoints\": [\"...\"], \
         \"improvementAreas\": [\"...\"]}}",
        context = request.context,
        user_goal = request.user_goal,
        ai_role = request.ai_role,
        transcript = render_transcript(&request.messages),
    )
}

/// Parses the raw LLM response. No partial recovery is attempted.
pub fn parse_feedback(raw: &str) -> Result<Feedback, FeedbackError> {
    Ok(serde_json::from_str(raw.trim())?)
}

/// Defines the contract for any service that can produce feedback.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait FeedbackGenerator: Send + Sync {
    async fn generate(&self, request: &FeedbackRequest) -> Result<Feedback, FeedbackError>;
}

/// A `FeedbackGenerator` backed by an LLM.
pub struct LLMFeedbackGenerator {
    llm: Arc<dyn LLMClient>,
}

impl LLMFeedbackGenerator {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl FeedbackGenerator for LLMFeedbackGenerator {
    async fn generate(&self, request: &FeedbackRequest) -> Result<Feedback, FeedbackError> {
        if request.messages.is_empty() {
            return Err(FeedbackError::EmptyTranscript);
        }
        let prompt = render_prompt(request);
        info!(messages = request.messages.len(), "Requesting feedback");

        let raw = self
            .llm
            .complete(FEEDBACK_SYSTEM_PROMPT, &prompt, ResponseShape::JsonObject)
            .await
            .map_err(FeedbackError::Llm)?;

        parse_feedback(&raw).inspect_err(|e| error!(error = %e, "Unparseable feedback response"))
    }
}

/// Runs a feedback request, failing with [`FeedbackError::Timeout`] once
/// `timeout` elapses.
pub async fn generate_with_timeout(
    generator: &dyn FeedbackGenerator,
    request: &FeedbackRequest,
    timeout: Duration,
) -> Result<Feedback, FeedbackError> {
    tokio::time::timeout(timeout, generator.generate(request))
        .await
        .unwrap_or(Err(FeedbackError::Timeout(timeout)))
}
