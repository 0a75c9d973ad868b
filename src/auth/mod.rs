use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SecurityConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub login: String,
    pub id: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(login: String, id: Uuid, expiry_minutes: i64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::minutes(expiry_minutes)).timestamp();

        Self {
            login,
            id,
            iat: now.timestamp(),
            exp,
        }
    }
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    Verification(String),
    InvalidSecret,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::Verification(msg) => write!(f, "JWT verification error: {}", msg),
            JwtError::InvalidSecret => write!(f, "Invalid JWT secret"),
        }
    }
}

impl std::error::Error for JwtError {}

/// Sign a short-lived HS256 token for the given user.
pub fn generate_jwt(login: &str, id: Uuid, security: &SecurityConfig) -> Result<String, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let claims = Claims::new(login.to_string(), id, security.jwt_expiry_minutes);
    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());

    encode(&Header::new(Algorithm::HS256), &claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Check signature and expiry, returning the embedded claims.
pub fn verify_jwt(token: &str, security: &SecurityConfig) -> Result<Claims, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| JwtError::Verification(e.to_string()))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn security(secret: &str) -> SecurityConfig {
        SecurityConfig {
            jwt_secret: secret.to_string(),
            jwt_expiry_minutes: 5,
            token_header: "x-access-token".to_string(),
            enable_cors: false,
        }
    }

    #[test]
    fn issued_tokens_verify_and_carry_identity() {
        let cfg = security("test-secret");
        let id = Uuid::new_v4();
        let token = generate_jwt("alice", id, &cfg).unwrap();

        let claims = verify_jwt(&token, &cfg).unwrap();
        assert_eq!(claims.login, "alice");
        assert_eq!(claims.id, id);
        assert_eq!(claims.exp - claims.iat, 300);
    }

    #[test]
    fn rejects_token_signed_with_another_secret() {
        let token = generate_jwt("alice", Uuid::new_v4(), &security("one")).unwrap();
        assert!(matches!(
            verify_jwt(&token, &security("two")),
            Err(JwtError::Verification(_))
        ));
    }

    #[test]
    fn rejects_expired_token() {
        let cfg = SecurityConfig {
            jwt_expiry_minutes: -1,
            ..security("test-secret")
        };
        let token = generate_jwt("alice", Uuid::new_v4(), &cfg).unwrap();
        assert!(verify_jwt(&token, &cfg).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(verify_jwt("not.a.token", &security("test-secret")).is_err());
    }

    #[test]
    fn refuses_empty_secret() {
        assert!(matches!(
            generate_jwt("alice", Uuid::new_v4(), &security("")),
            Err(JwtError::InvalidSecret)
        ));
    }
}
