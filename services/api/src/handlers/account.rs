//! Onboarding, usage and vendor key endpoints.

use axum::{extract::State, response::Json};
use oratoria_core::{
    keys::KeyStatus,
    users::{UserProfile, UserStore},
};
use std::sync::Arc;
use tracing::info;

use super::ApiError;
use crate::{
    auth::AuthUser,
    extractors::JsonBody,
    models::{ErrorResponse, UsageResponse, ValidateKeysPayload},
    state::AppState,
};

/// Check whether vendor API keys are accepted by their vendors.
#[utoipa::path(
    post,
    path = "/api/validate-keys",
    request_body = ValidateKeysPayload,
    responses(
        (status = 200, description = "Validity of each key", body = KeyStatus),
        (status = 400, description = "Malformed request body", body = ErrorResponse)
    )
)]
pub async fn validate_keys(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<ValidateKeysPayload>,
) -> Json<KeyStatus> {
    let status = state
        .keys
        .validate(&payload.eleven_labs_key, &payload.fal_ai_key)
        .await;
    info!(
        elevenlabs = status.elevenlabs,
        falai = status.falai,
        "Validated vendor keys"
    );
    Json(status)
}

/// Latest result of the periodic check of the service's own vendor keys.
/// Reports both keys invalid until the first check completes.
#[utoipa::path(
    get,
    path = "/api/key-status",
    responses(
        (status = 200, description = "Validity of the configured keys", body = KeyStatus),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    ),
    params(
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn key_status(
    State(state): State<Arc<AppState>>,
    AuthUser(_user_id): AuthUser,
) -> Json<KeyStatus> {
    let status = state
        .key_monitor
        .as_ref()
        .and_then(|monitor| monitor.latest())
        .unwrap_or_default();
    Json(status)
}

/// Mark the caller as onboarded.
#[utoipa::path(
    post,
    path = "/api/onboarding",
    responses(
        (status = 200, description = "Updated profile", body = UserProfile),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    ),
    params(
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn complete_onboarding(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state.store.complete_onboarding(&user_id).await?;
    info!(%user_id, "User onboarded");
    Ok(Json(profile))
}

/// How many free practice conversations the caller has used.
#[utoipa::path(
    get,
    path = "/api/usage",
    responses(
        (status = 200, description = "Conversation usage", body = UsageResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    ),
    params(
        ("x-user-id" = String, Header, description = "The ID of the user")
    )
)]
pub async fn usage(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UsageResponse>, ApiError> {
    let used = state
        .store
        .profile(&user_id)
        .await?
        .map_or(0, |p| p.free_conversations_used);
    Ok(Json(UsageResponse::new(
        used,
        state.config.free_conversation_limit,
    )))
}
