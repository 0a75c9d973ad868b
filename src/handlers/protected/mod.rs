// handlers/protected/mod.rs - Handlers behind the token gate

use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;

pub mod groups;
pub mod users;

/// `{ "id": ... }`, returned by updates and by group writes that attached users.
#[derive(Debug, Serialize)]
pub struct IdResponse {
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub const ROUTE_NOT_FOUND: &str = "Route not found.";

/// Fallback for paths under the API base; only reached once the token gate passed.
pub async fn unknown_route() -> ApiError {
    ApiError::not_found(ROUTE_NOT_FOUND)
}
