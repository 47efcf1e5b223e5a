use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use super::AppState;
use crate::domain::aggregates::User;
use crate::AppError;

/// Set by the upstream auth proxy once it has validated the caller's token.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The caller, resolved to an existing user.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .ok_or(AppError::Unauthorized)?;
        let user = state.store.find_user(id).await?.ok_or(AppError::Unauthorized)?;
        Ok(Self(user))
    }
}
