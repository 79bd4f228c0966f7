/// Bearer-token authentication for Axum
///
/// Validates Clerk session tokens from the `Authorization: Bearer <token>`
/// header and produces an [`AuthContext`] for the request extensions.
///
/// # Example
///
/// ```no_run
/// use axum::{extract::{Request, State}, middleware::Next, response::Response};
/// use std::sync::Arc;
/// use taskhub_shared::auth::jwt::TokenVerifier;
/// use taskhub_shared::auth::middleware::{authenticate, AuthError};
///
/// async fn require_clerk(
///     State(verifier): State<Arc<TokenVerifier>>,
///     mut req: Request,
///     next: Next,
/// ) -> Result<Response, AuthError> {
///     let context = authenticate(&verifier, req.headers()).await?;
///     req.extensions_mut().insert(context);
///     Ok(next.run(req).await)
/// }
/// ```

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::jwt::{ClerkClaims, JwtError, TokenVerifier};

/// Identity of the authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Clerk user ID (`sub`)
    pub clerk_id: String,

    /// Clerk session ID (`sid`), if present
    pub session_id: Option<String>,
}

impl From<ClerkClaims> for AuthContext {
    fn from(claims: ClerkClaims) -> Self {
        Self {
            clerk_id: claims.sub,
            session_id: claims.sid,
        }
    }
}

/// Error type for authentication middleware
#[derive(Debug)]
pub enum AuthError {
    /// Missing authorization header
    MissingCredentials,

    /// Header is not `Bearer <token>`
    InvalidFormat(String),

    /// Token validation failed
    InvalidToken(String),

    /// Keys could not be loaded
    KeysUnavailable(String),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Jwks(msg) => AuthError::KeysUnavailable(msg),
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            other => AuthError::InvalidToken(other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingCredentials => {
                (StatusCode::UNAUTHORIZED, "Missing credentials".to_string())
            }
            AuthError::InvalidFormat(msg) => (StatusCode::UNAUTHORIZED, msg),
            AuthError::InvalidToken(msg) => (StatusCode::UNAUTHORIZED, msg),
            AuthError::KeysUnavailable(msg) => {
                tracing::error!(error = %msg, "Clerk JWKS unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Authentication temporarily unavailable".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": "unauthorized",
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Extracts the bearer token from request headers
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Verifies the request's bearer token
pub async fn authenticate(verifier: &TokenVerifier, headers: &HeaderMap) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;

    let claims = verifier.verify(token).await.map_err(|e| {
        debug!(error = %e, "Rejected bearer token");
        AuthError::from(e)
    })?;

    Ok(claims.into())
}
