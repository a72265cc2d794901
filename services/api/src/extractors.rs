//! Request body extraction with the service's error shape.

use axum::{
    Json,
    extract::{FromRequest, OptionalFromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;

use crate::handlers::ApiError;

/// A JSON request body. Unlike `axum::Json`, every rejection (wrong content
/// type, malformed JSON, missing or mistyped fields) becomes a 400 with the
/// usual `{ "message": ... }` body.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

fn bad_request(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest(rejection.body_text())
}

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = <Json<T> as FromRequest<S>>::from_request(req, state)
            .await
            .map_err(bad_request)?;
        Ok(Self(value))
    }
}

/// A request without a `Content-Type` header extracts as `None`.
impl<S, T> OptionalFromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
        let value = <Json<T> as OptionalFromRequest<S>>::from_request(req, state)
            .await
            .map_err(bad_request)?;
        Ok(value.map(|Json(value)| Self(value)))
    }
}
