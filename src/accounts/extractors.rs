use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use crate::accounts::repo::{AuthToken, User};
use crate::error::ApiError;
use crate::state::AppState;

/// Resolves the request's bearer token to its user row. Handlers taking this
/// extractor are authenticated; everything else is public.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::Auth("Missing Authorization header".into()))?;

        // Accept both the classic "Token <key>" scheme and "Bearer <key>".
        let key = auth
            .strip_prefix("Token ")
            .or_else(|| auth.strip_prefix("Bearer "))
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::Auth("Invalid auth scheme".into()))?;

        match AuthToken::resolve_user(&state.db, key).await? {
            Some(user) => Ok(AuthUser(user)),
            None => {
                warn!("request with unknown or revoked token");
                Err(ApiError::Auth("Invalid token".into()))
            }
        }
    }
}
