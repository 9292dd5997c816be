use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose, Engine};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::ApiError;
use crate::state::AppState;

const TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

pub fn create_token(user_id: &str, jwt_secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
        + TOKEN_TTL_SECS;
    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(jwt_secret.as_bytes()))
}

pub fn validate_token(token: &str, jwt_secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims.sub)
}

/// The demo credential format: base64 of the password, nothing more.
pub fn encode_password(password: &str) -> String {
    general_purpose::STANDARD.encode(password.as_bytes())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    !password_hash.is_empty() && encode_password(password) == password_hash
}

/// Bearer-token gate for mutating routes, active only when `require_auth` is set.
pub async fn authenticate(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.config.require_auth {
        return Ok(next.run(request).await);
    }

    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;
    let token = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            ApiError::Unauthorized("Invalid Authorization header format".to_string())
        })?;
    let user_id = validate_token(token, &state.config.jwt_secret)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

    log::debug!("Authenticated user: {} for {}", user_id, request.uri());
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let token = create_token("USER_42", "s3cret").unwrap();
        assert_eq!(validate_token(&token, "s3cret").unwrap(), "USER_42");
        assert!(validate_token(&token, "other").is_err());
    }

    #[test]
    fn password_encoding_matches_the_browser() {
        // btoa("admin123")
        assert_eq!(encode_password("admin123"), "YWRtaW4xMjM=");
        assert!(verify_password("admin123", "YWRtaW4xMjM="));
        assert!(!verify_password("admin124", "YWRtaW4xMjM="));
        assert!(!verify_password("", ""));
    }
}
