use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;
use crate::validation::{parse_id, validate, Shape};

/// The `:id` path segment, rejected with 400 unless it is a well-formed id.
#[derive(Debug, Clone, Copy)]
pub struct ValidId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for ValidId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::incorrect_id())?;

        parse_id(&raw).map(ValidId).ok_or_else(ApiError::incorrect_id)
    }
}

/// A JSON body checked against shape `T`; unknown fields are already stripped.
pub struct ValidatedJson<T: Shape>(pub T::Output);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: Shape,
    T::Output: Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::invalid_json(rejection.body_text()))?;

        Ok(ValidatedJson(validate::<T>(&value)?))
    }
}
