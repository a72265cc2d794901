//! Caller identity.
//!
//! Authentication is handled by the auth provider's proxy, which forwards the
//! signed-in user's id in the `x-user-id` header. This module only reads it.

use axum::{extract::FromRequestParts, http::HeaderMap, http::request::Parts};

use crate::handlers::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Returns the caller's user id, if the request carries a non-empty one.
pub fn user_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Extractor for endpoints that require a signed-in user. Rejects with 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        user_id_from_headers(&parts.headers)
            .map(AuthUser)
            .ok_or_else(|| ApiError::Unauthorized("x-user-id header is required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_user_id_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(user_id_from_headers(&headers), None);

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("   "));
        assert_eq!(user_id_from_headers(&headers), None);

        headers.insert(USER_ID_HEADER, HeaderValue::from_static(" user_123 "));
        assert_eq!(user_id_from_headers(&headers).as_deref(), Some("user_123"));
    }
}
