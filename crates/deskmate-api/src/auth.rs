//! API authentication via per-user bearer tokens.
//!
//! Provides token generation and the middleware that resolves
//! `Authorization: Bearer <token>` to a stored user. The resolved
//! [`User`] is placed in the request extensions for the handlers.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use rand::Rng;

use deskmate_core::types::User;
use deskmate_storage::UserRepository;

use crate::error::ApiError;
use crate::state::AppState;

/// Generate a random 32-character hex token.
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    hex::encode(bytes)
}

fn bearer_token(req: &Request) -> Result<&str, ApiError> {
    let value = req
        .headers()
        .get("authorization")
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;
    let value = value.to_str().map_err(|_| {
        ApiError::Unauthorized("Invalid Authorization header encoding".to_string())
    })?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Invalid bearer token".to_string()))
}

/// Middleware that validates Bearer token authentication.
///
/// Looks the token up in the users table. Returns 401 if it is missing or
/// unknown.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let token = match bearer_token(&req) {
        Ok(token) => token.to_string(),
        Err(e) => return e.into_response(),
    };

    let user = match UserRepository::new(state.database.clone()).find_by_token(&token) {
        Ok(Some(user)) => user,
        Ok(None) => {
            return ApiError::Unauthorized("Invalid bearer token".to_string()).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Token lookup failed");
            return ApiError::from(e).into_response();
        }
    };

    req.extensions_mut().insert(user);
    next.run(req).await
}

/// Middleware that rejects non-administrators with 403.
///
/// Must run inside [`require_auth`].
pub async fn require_admin(req: Request, next: Next) -> Response {
    match req.extensions().get::<User>() {
        Some(user) if user.is_admin() => next.run(req).await,
        Some(user) => {
            tracing::warn!(user_id = user.id, "Admin route refused");
            ApiError::Forbidden("Administrator access required".to_string()).into_response()
        }
        None => ApiError::Unauthorized("Missing Authorization header".to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http;

    #[test]
    fn test_generate_token_is_hex() {
        let token = generate_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_bearer_token_parsing() {
        let req = http::Request::builder()
            .header("authorization", "Bearer abc123")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&req).unwrap(), "abc123");

        let req = http::Request::builder()
            .header("authorization", "Basic abc123")
            .body(Body::empty())
            .unwrap();
        assert!(matches!(bearer_token(&req), Err(ApiError::Unauthorized(_))));

        let req = http::Request::builder().body(Body::empty()).unwrap();
        assert!(matches!(
            bearer_token(&req),
            Err(ApiError::Unauthorized(msg)) if msg.starts_with("Missing")
        ));
    }
}
