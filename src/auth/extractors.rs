use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::repo::User;
use crate::error::ApiError;
use crate::state::AppState;

/// Authorization gate for protected routes: resolves the `Authorization:
/// Bearer <token>` header to a user record, or rejects with 401 before the
/// handler runs.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(ApiError::unauthorized)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(ApiError::unauthorized)?;

        let user = User::find_by_token(&state.db, token)
            .await?
            .ok_or_else(ApiError::unauthorized)?;

        Ok(AuthUser(user))
    }
}
