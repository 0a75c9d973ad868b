use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{verify_jwt, Claims};
use crate::config::SecurityConfig;
use crate::error::ApiError;
use crate::state::AppState;

pub const TOKEN_NOT_FOUND: &str = "Token not found.";
pub const FAILED_TO_AUTHORIZE: &str = "Failed to authorize.";

/// Authenticated user context extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub login: String,
    pub id: Uuid,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            login: claims.login,
            id: claims.id,
        }
    }
}

/// Rejects requests without a valid token in the configured header
pub async fn require_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = authorize(request.headers(), &state.config.security)?;

    tracing::debug!("Authorized {} ({})", claims.login, claims.id);
    request.extensions_mut().insert(AuthUser::from(claims));

    Ok(next.run(request).await)
}

fn authorize(headers: &HeaderMap, security: &SecurityConfig) -> Result<Claims, ApiError> {
    let header = headers
        .get(security.token_header.as_str())
        .ok_or_else(|| ApiError::forbidden(TOKEN_NOT_FOUND))?;

    let token = header
        .to_str()
        .map(str::trim)
        .map_err(|_| ApiError::forbidden(FAILED_TO_AUTHORIZE))?;

    if token.is_empty() {
        return Err(ApiError::forbidden(TOKEN_NOT_FOUND));
    }

    verify_jwt(token, security).map_err(|e| {
        tracing::debug!("Token rejected: {}", e);
        ApiError::forbidden(FAILED_TO_AUTHORIZE)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::generate_jwt;
    use axum::http::HeaderValue;

    fn security() -> SecurityConfig {
        SecurityConfig {
            jwt_secret: "test-secret".to_string(),
            jwt_expiry_minutes: 5,
            token_header: "x-access-token".to_string(),
            enable_cors: false,
        }
    }

    #[test]
    fn missing_header_is_token_not_found() {
        let err = authorize(&HeaderMap::new(), &security()).unwrap_err();
        assert_eq!(err.to_string(), TOKEN_NOT_FOUND);
    }

    #[test]
    fn bad_token_fails_to_authorize() {
        let mut headers = HeaderMap::new();
        headers.insert("x-access-token", HeaderValue::from_static("abc"));
        let err = authorize(&headers, &security()).unwrap_err();
        assert_eq!(err.to_string(), FAILED_TO_AUTHORIZE);
    }

    #[test]
    fn valid_token_yields_claims() {
        let cfg = security();
        let id = Uuid::new_v4();
        let token = generate_jwt("alice", id, &cfg).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("x-access-token", HeaderValue::from_str(&token).unwrap());
        let claims = authorize(&headers, &cfg).unwrap();
        assert_eq!(claims.id, id);
    }
}
