//! Bearer token extraction and session validation for handlers

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use tracing::debug;

use crate::{AppState, error::AuthError, models::User};

/// The validated user behind a request, plus the raw token it presented
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub user: User,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|e| {
                    debug!("Missing or malformed Authorization header: {}", e);
                    AuthError::TokenInvalidOrExpired
                })?;

        let token = bearer.token().to_string();
        let user = state.sessions.validate(&token).await?;

        Ok(CurrentSession { user, token })
    }
}
