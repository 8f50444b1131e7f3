//! Session JWT authentication for the tab API

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::state::AppState;

/// JWT claims issued by the session provider
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User ID (UUID)
    pub sub: String,
    pub email: String,
    /// Shops where the user is staff
    #[serde(default)]
    pub staff_shops: Vec<i64>,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

/// Authenticated user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub email: String,
    pub staff_shops: BTreeSet<i64>,
}

impl Actor {
    pub fn is_staff_of(&self, shop_id: i64) -> bool {
        self.staff_shops.contains(&shop_id)
    }
}

/// Per-request identity handed to every service operation
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub actor: Actor,
    pub request_id: Option<String>,
}

impl RequestContext {
    pub fn new(actor: Actor) -> Self {
        Self {
            actor,
            request_id: None,
        }
    }
}

const JWT_EXPIRY_HOURS: i64 = 24;

/// Create a session token (used by tests and local tooling)
pub fn create_token(
    user_id: Uuid,
    email: &str,
    staff_shops: &[i64],
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = SessionClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        staff_shops: staff_shops.to_vec(),
        exp: (now + chrono::Duration::hours(JWT_EXPIRY_HOURS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify a token and turn its claims into an `Actor`
pub fn verify_token(token: &str, secret: &str) -> Result<Actor, AppError> {
    let token_data = jsonwebtoken::decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::new(ErrorCode::TokenExpired)
            }
            _ => AppError::invalid_token("Invalid or expired token"),
        }
    })?;

    let claims = token_data.claims;
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::invalid_token("Token subject is not a user id"))?;

    Ok(Actor {
        user_id,
        email: claims.email,
        staff_shops: claims.staff_shops.into_iter().collect(),
    })
}

/// Middleware that verifies the bearer token and injects a `RequestContext`
pub async fn session_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let auth_header = request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::not_authenticated().into_response())?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::invalid_token("Invalid Authorization format").into_response())?;

    let actor = verify_token(token, &state.jwt_secret).map_err(IntoResponse::into_response)?;

    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    request
        .extensions_mut()
        .insert(RequestContext { actor, request_id });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_token_round_trip_carries_staff_shops() {
        let user_id = Uuid::new_v4();
        let token = create_token(user_id, "ops@example.edu", &[3, 1], SECRET).unwrap();
        let actor = verify_token(&token, SECRET).unwrap();
        assert_eq!(actor.user_id, user_id);
        assert_eq!(actor.email, "ops@example.edu");
        assert!(actor.is_staff_of(1));
        assert!(actor.is_staff_of(3));
        assert!(!actor.is_staff_of(2));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_token(Uuid::new_v4(), "a@example.edu", &[], SECRET).unwrap();
        let err = verify_token(&token, "other-secret").unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenInvalid);
    }

    #[test]
    fn test_non_uuid_subject_rejected() {
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = SessionClaims {
            sub: "user-42".into(),
            email: "a@example.edu".into(),
            staff_shops: vec![],
            exp: now + 3600,
            iat: now,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert_eq!(
            verify_token(&token, SECRET).unwrap_err().code,
            ErrorCode::TokenInvalid
        );
    }
}
