/// Bearer token authentication
///
/// `AuthContext` is an extractor: adding it to a handler's arguments makes
/// the route require a valid `Authorization: Bearer <token>` header whose
/// subject is an existing user. Public routes simply don't ask for it.
///
/// # Errors (all 401)
///
/// - no header / not a Bearer header: "Not authorized, no token provided"
/// - expired token: "Token expired"
/// - bad signature, issuer or format: "Invalid token"
/// - user deleted since the token was issued: "User not found"
///
/// # Example
///
/// ```no_run
/// use bookshelf_api::middleware::auth::AuthContext;
///
/// async fn whoami(auth: AuthContext) -> String {
///     format!("Hello, {}!", auth.user.name)
/// }
/// ```

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use bookshelf_shared::{auth::jwt, models::user::UserSummary};
use uuid::Uuid;

use crate::{app::AppState, error::ApiError};

/// The authenticated requester
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,

    /// Public profile, loaded fresh for every request
    pub user: UserSummary,
}

/// Extracts the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| {
            ApiError::Unauthorized("Not authorized, no token provided".to_string())
        })?;

        let claims = jwt::validate_token(token, state.jwt_secret()).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            ApiError::from(e)
        })?;

        let user = state
            .store
            .find_user(claims.sub)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

        Ok(Self {
            user_id: user.id,
            user: UserSummary::from(user),
        })
    }
}
