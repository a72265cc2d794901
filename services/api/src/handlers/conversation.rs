//! Conversation, feedback and course-coach endpoints.

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
};
use oratoria_core::{
    coach::CoachRequest,
    feedback::{
        FEEDBACK_FAILED_MESSAGE, Feedback, FeedbackError, FeedbackRequest, generate_with_timeout,
    },
    users::UserStore,
    voice::VoiceSessionCredentials,
};
use std::sync::Arc;
use tracing::info;

use super::ApiError;
use crate::{
    auth::{AuthUser, user_id_from_headers},
    extractors::JsonBody,
    models::{CoachResponse, ConversationAction, ConversationRequest, ErrorResponse},
    state::AppState,
};

/// Fails with 403 once the user has used up a non-zero free conversation limit.
pub async fn ensure_conversation_allowance(
    state: &AppState,
    user_id: &str,
) -> Result<(), ApiError> {
    let limit = state.config.free_conversation_limit;
    if limit > 0 {
        let used = state
            .store
            .profile(user_id)
            .await?
            .map_or(0, |p| p.free_conversations_used);
        if used >= limit {
            return Err(limit_reached(limit));
        }
    }
    Ok(())
}

fn limit_reached(limit: u32) -> ApiError {
    ApiError::Forbidden(format!("Free conversation limit of {limit} reached"))
}

/// Counts a started conversation. The store re-checks the limit atomically,
/// so concurrent starts that all passed [`ensure_conversation_allowance`]
/// cannot exceed it.
pub async fn record_conversation(state: &AppState, user_id: &str) -> Result<u32, ApiError> {
    let limit = state.config.free_conversation_limit;
    state
        .store
        .record_conversation(user_id, limit)
        .await?
        .ok_or_else(|| limit_reached(limit))
}

/// Obtains voice vendor credentials for a new conversation.
pub async fn start_voice_session(state: &AppState) -> Result<VoiceSessionCredentials, ApiError> {
    state
        .voice
        .start_session()
        .await
        .map_err(|e| ApiError::upstream("Failed to start conversation", e))
}

/// Runs the feedback pipeline with the configured timeout.
pub async fn run_feedback(
    state: &AppState,
    request: &FeedbackRequest,
) -> Result<Feedback, ApiError> {
    if request.messages.is_empty() {
        return Err(ApiError::BadRequest(
            "messages must contain at least one message".to_string(),
        ));
    }
    let timeout = state.config.feedback_timeout;
    match generate_with_timeout(state.feedback.as_ref(), request, timeout).await {
        Ok(feedback) => Ok(feedback),
        Err(FeedbackError::EmptyTranscript) => Err(ApiError::BadRequest(
            "messages must contain at least one message".to_string(),
        )),
        Err(e) => Err(ApiError::upstream(FEEDBACK_FAILED_MESSAGE, e)),
    }
}

/// Start a voice conversation or request feedback for a finished one.
///
/// `start` answers with `{url, agentId}`, `feedback` with the feedback object.
#[utoipa::path(
    post,
    path = "/api/conversation",
    request_body = ConversationRequest,
    responses(
        (status = 200, description = "Voice credentials for `start`, feedback for `feedback`", body = VoiceSessionCredentials),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 403, description = "Free conversation limit reached", body = ErrorResponse),
        (status = 500, description = "Vendor or LLM failure", body = ErrorResponse)
    ),
    params(
        ("x-user-id" = Option<String>, Header, description = "The ID of the user, if signed in")
    )
)]
pub async fn conversation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    JsonBody(payload): JsonBody<ConversationRequest>,
) -> Result<Response, ApiError> {
    match payload.action {
        ConversationAction::Start => {
            let user_id = user_id_from_headers(&headers);
            if let Some(user_id) = &user_id {
                ensure_conversation_allowance(&state, user_id).await?;
            }
            let credentials = start_voice_session(&state).await?;
            if let Some(user_id) = &user_id {
                let used = record_conversation(&state, user_id).await?;
                info!(%user_id, used, "Conversation started");
            }
            Ok(Json(credentials).into_response())
        }
        ConversationAction::Feedback => {
            let request = payload.feedback_request().map_err(ApiError::BadRequest)?;
            let feedback = run_feedback(&state, &request).await?;
            Ok(Json(feedback).into_response())
        }
    }
}

/// Generate structured feedback for a conversation transcript.
#[utoipa::path(
    post,
    path = "/api/feedback",
    request_body = FeedbackRequest,
    responses(
        (status = 200, description = "Feedback generated", body = Feedback),
        (status = 400, description = "Empty transcript", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 500, description = "Failed to generate feedback", body = ErrorResponse)
    ),
    params(
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn feedback(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    JsonBody(request): JsonBody<FeedbackRequest>,
) -> Result<Json<Feedback>, ApiError> {
    info!(%user_id, messages = request.messages.len(), "Feedback requested");
    Ok(Json(run_feedback(&state, &request).await?))
}

/// Get coaching on a written answer to a lesson prompt.
#[utoipa::path(
    post,
    path = "/api/course-coach",
    request_body = CoachRequest,
    responses(
        (status = 200, description = "Coaching feedback", body = CoachResponse),
        (status = 400, description = "Empty response", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 500, description = "LLM failure", body = ErrorResponse)
    ),
    params(
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn course_coach(
    State(state): State<Arc<AppState>>,
    AuthUser(_user_id): AuthUser,
    JsonBody(request): JsonBody<CoachRequest>,
) -> Result<Json<CoachResponse>, ApiError> {
    if request.user_response.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "userResponse must not be empty".to_string(),
        ));
    }
    let feedback = state
        .coach
        .coach(&request)
        .await
        .map_err(|e| ApiError::upstream("Failed to generate coaching feedback", e))?;
    Ok(Json(CoachResponse { feedback }))
}
