// handlers/public/authenticate.rs - POST /authenticate handler

use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::Value;

use crate::auth::generate_jwt;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

pub struct AuthenticateMessages;

impl AuthenticateMessages {
    pub const NOT_REGISTERED: &'static str =
        "This combination of password and login is not registered in the system.";
    pub const MISSING_CREDENTIALS: &'static str = "Enter login and password.";
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/**
 * POST /authenticate - Exchange login and password for a short-lived token
 *
 * Expected Input:
 * ```json
 * { "login": "string", "password": "string" }
 * ```
 *
 * Expected Output (Success):
 * ```json
 * { "token": "eyJhbGciOiJIUzI1NiI..." }
 * ```
 *
 * A missing or unparseable body counts as missing credentials.
 */
pub async fn authenticate(
    State(state): State<AppState>,
    body: Option<Json<Value>>,
) -> ApiResult<TokenResponse> {
    let body = body.map(|Json(value)| value).unwrap_or(Value::Null);
    let (Some(login), Some(password)) = (credential(&body, "login"), credential(&body, "password"))
    else {
        return Err(ApiError::unauthorized(AuthenticateMessages::MISSING_CREDENTIALS));
    };

    let user = state
        .gateway
        .find_user_by_login(login)
        .await?
        .filter(|user| !user.is_deleted && user.password == password)
        .ok_or_else(|| ApiError::unauthorized(AuthenticateMessages::NOT_REGISTERED))?;

    let token = generate_jwt(&user.login, user.id, &state.config.security)?;
    tracing::info!("Issued token for {}", user.login);

    Ok(ApiResponse::success(TokenResponse { token }))
}

fn credential<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}
