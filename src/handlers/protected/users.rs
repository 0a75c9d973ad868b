// handlers/protected/users.rs - /users and /users/:id handlers

use axum::extract::{Query, State};
use uuid::Uuid;

use super::{IdResponse, MessageResponse};
use crate::database::models::User;
use crate::error::ApiError;
use crate::filter::ListQuery;
use crate::middleware::{ApiResponse, ApiResult, ValidId, ValidatedJson};
use crate::state::AppState;
use crate::validation::UserShape;

pub struct UserMessages;

impl UserMessages {
    pub const NOT_FOUND: &'static str = "User not found.";
    pub const DELETED: &'static str = "User was deleted.";
}

/// GET /users?loginSubstring=&limit= - Active users, optionally narrowed by login substrings
pub async fn list(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Vec<User>> {
    let filter = ListQuery::from_pairs(&pairs).into_filter(&state.config.api);
    let users = state.gateway.find_users(&filter).await?;
    Ok(ApiResponse::success(users))
}

/// POST /users
pub async fn create(
    State(state): State<AppState>,
    ValidatedJson(patch): ValidatedJson<UserShape>,
) -> ApiResult<User> {
    let user = state.gateway.create_user(&User::new(patch)).await?;
    tracing::info!("Created user {}", user.id);
    Ok(ApiResponse::created(user))
}

/// GET /users/:id
pub async fn get(State(state): State<AppState>, ValidId(id): ValidId) -> ApiResult<User> {
    let user = find_active(&state, id).await?;
    Ok(ApiResponse::success(user))
}

/// PUT /users/:id - Replace login, password and age of an active user
pub async fn update(
    State(state): State<AppState>,
    ValidId(id): ValidId,
    ValidatedJson(patch): ValidatedJson<UserShape>,
) -> ApiResult<IdResponse> {
    find_active(&state, id).await?;

    match state.gateway.update_user(id, &patch).await? {
        0 => Err(ApiError::unexpected()),
        _ => Ok(ApiResponse::success(IdResponse { id })),
    }
}

/// DELETE /users/:id - Soft delete; the row is kept with `isDeleted` set
pub async fn delete(
    State(state): State<AppState>,
    ValidId(id): ValidId,
) -> ApiResult<MessageResponse> {
    find_active(&state, id).await?;

    match state.gateway.soft_delete_user(id).await? {
        0 => Err(ApiError::unexpected()),
        _ => Ok(ApiResponse::success(MessageResponse {
            message: UserMessages::DELETED,
        })),
    }
}

// Soft-deleted users are indistinguishable from missing ones.
async fn find_active(state: &AppState, id: Uuid) -> Result<User, ApiError> {
    state
        .gateway
        .find_user_by_id(id)
        .await?
        .filter(|user| !user.is_deleted)
        .ok_or_else(|| ApiError::not_found(UserMessages::NOT_FOUND))
}
