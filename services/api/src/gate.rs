//! Navigation/Access Gate
//!
//! Decides, per request path, whether the caller may proceed, must be sent
//! somewhere else first, or is rejected outright. The decision itself is a
//! pure function; [`access_gate`] is the axum middleware that feeds it.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use oratoria_core::users::UserStore;
use std::sync::Arc;
use tracing::debug;

use crate::{auth::user_id_from_headers, handlers::ApiError, state::AppState};

pub const SIGN_IN_PATH: &str = "/sign-in";
pub const ONBOARDING_PATH: &str = "/onboarding";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Paths reachable by anyone. Entries ending in `*` match by prefix.
const PUBLIC_PATHS: &[&str] = &[
    "/",
    "/sign-in*",
    "/sign-up*",
    "/health",
    "/swagger-ui*",
    "/api-docs*",
    "/api/validate-keys",
    "/api/conversation",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    SignedIn { onboarded: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(&'static str),
    Unauthorized,
}

pub fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|pattern| match pattern.strip_suffix('*') {
        Some(prefix) => path.starts_with(prefix),
        None => path == *pattern,
    })
}

/// API and WebSocket paths answer with status codes rather than redirects.
pub fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/") || path.starts_with("/ws/")
}

pub fn gate(path: &str, viewer: Viewer) -> GateDecision {
    if is_public(path) {
        return GateDecision::Allow;
    }
    match viewer {
        Viewer::Anonymous if is_api_path(path) => GateDecision::Unauthorized,
        Viewer::Anonymous => GateDecision::Redirect(SIGN_IN_PATH),
        Viewer::SignedIn { .. } if is_api_path(path) => GateDecision::Allow,
        Viewer::SignedIn { onboarded: false } if path != ONBOARDING_PATH => {
            GateDecision::Redirect(ONBOARDING_PATH)
        }
        Viewer::SignedIn { onboarded: true } if path == ONBOARDING_PATH => {
            GateDecision::Redirect(DASHBOARD_PATH)
        }
        Viewer::SignedIn { .. } => GateDecision::Allow,
    }
}

/// Middleware applying [`gate`] to every request. Onboarding state is read
/// from the user store.
pub async fn access_gate(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if is_public(&path) {
        return next.run(request).await;
    }

    let viewer = match user_id_from_headers(request.headers()) {
        None => Viewer::Anonymous,
        Some(user_id) => match state.store.profile(&user_id).await {
            Ok(profile) => Viewer::SignedIn {
                onboarded: profile.is_some_and(|p| p.onboarded),
            },
            Err(e) => return ApiError::from(e).into_response(),
        },
    };

    match gate(&path, viewer) {
        GateDecision::Allow => next.run(request).await,
        GateDecision::Redirect(to) => {
            debug!(%path, to, "Redirecting");
            Redirect::to(to).into_response()
        }
        GateDecision::Unauthorized => {
            ApiError::Unauthorized("Authentication required".to_string()).into_response()
        }
    }
}
