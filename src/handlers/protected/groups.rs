// handlers/protected/groups.rs - /groups and /groups/:id handlers

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use super::{IdResponse, MessageResponse};
use crate::database::models::Group;
use crate::database::UnitOfWork;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidId, ValidatedJson};
use crate::state::AppState;
use crate::validation::GroupShape;

pub struct GroupMessages;

impl GroupMessages {
    pub const NOT_FOUND: &'static str = "Group not found.";
    pub const DELETED: &'static str = "Group was deleted.";
}

/// GET /groups
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Group>> {
    let groups = state.gateway.find_groups().await?;
    Ok(ApiResponse::success(groups))
}

/**
 * POST /groups - Create a group, optionally attaching users in the same transaction
 *
 * Expected Input:
 * ```json
 * { "name": "string", "permissions": ["READ"], "usersIds": ["uuid"] }
 * ```
 *
 * Without `usersIds` the created group is returned with 201. With `usersIds`
 * (even an empty list) the memberships are written too and the response is
 * 200 `{ "id": ... }`. Any failure rolls back both the group and its memberships.
 */
pub async fn create(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<GroupShape>,
) -> Result<Response, ApiError> {
    let group = Group::new(input.patch);
    let mut uow = state.gateway.begin().await?;

    let outcome = uow.create_group(&group).await;
    let created = match outcome {
        Ok(created) => created,
        Err(e) => return Err(rollback(uow, e.into()).await),
    };

    if let Some(users_ids) = input.users_ids {
        let attached = attach(uow.as_mut(), created.id, &users_ids).await;
        if let Err(err) = attached {
            return Err(rollback(uow, err).await);
        }
        uow.commit().await?;
        tracing::info!("Created group {} with {} users", created.id, users_ids.len());
        return Ok(ApiResponse::success(IdResponse { id: created.id }).into_response());
    }

    uow.commit().await?;
    tracing::info!("Created group {}", created.id);
    Ok(ApiResponse::created(created).into_response())
}

/// GET /groups/:id
pub async fn get(State(state): State<AppState>, ValidId(id): ValidId) -> ApiResult<Group> {
    let group = find_existing(&state, id).await?;
    Ok(ApiResponse::success(group))
}

/// PUT /groups/:id - Replace name and permissions, optionally attaching users
pub async fn update(
    State(state): State<AppState>,
    ValidId(id): ValidId,
    ValidatedJson(input): ValidatedJson<GroupShape>,
) -> ApiResult<IdResponse> {
    find_existing(&state, id).await?;
    let mut uow = state.gateway.begin().await?;

    let outcome = uow.update_group(id, &input.patch).await;
    match outcome {
        Ok(0) => return Err(rollback(uow, ApiError::unexpected()).await),
        Ok(_) => {}
        Err(e) => return Err(rollback(uow, e.into()).await),
    }

    if let Some(users_ids) = &input.users_ids {
        let attached = attach(uow.as_mut(), id, users_ids).await;
        if let Err(err) = attached {
            return Err(rollback(uow, err).await);
        }
    }

    uow.commit().await?;
    Ok(ApiResponse::success(IdResponse { id }))
}

/// DELETE /groups/:id - Hard delete; memberships go with it
pub async fn delete(
    State(state): State<AppState>,
    ValidId(id): ValidId,
) -> ApiResult<MessageResponse> {
    find_existing(&state, id).await?;

    match state.gateway.hard_delete_group(id).await? {
        0 => Err(ApiError::unexpected()),
        _ => Ok(ApiResponse::success(MessageResponse {
            message: GroupMessages::DELETED,
        })),
    }
}

async fn find_existing(state: &AppState, id: Uuid) -> Result<Group, ApiError> {
    state
        .gateway
        .find_group_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(GroupMessages::NOT_FOUND))
}

async fn attach(uow: &mut dyn UnitOfWork, group_id: Uuid, users_ids: &[Uuid]) -> Result<(), ApiError> {
    let attachment = uow.attach_users_to_group(group_id, users_ids).await?;
    tracing::debug!("Attached {} users to group {}", attachment.attached, group_id);
    Ok(())
}

/// Discard the unit of work and hand back the error that caused it.
async fn rollback(uow: Box<dyn UnitOfWork>, err: ApiError) -> ApiError {
    if let Err(e) = uow.rollback().await {
        tracing::error!("Rollback failed: {}", e);
    }
    err
}
