//! # Session Extractors
//!
//! Turn the `sid` cookie into an explicit [`AuthContext`]. `MaybeUser`
//! never rejects; guarded services decide what anonymous callers may do.
//! `CurrentUser` rejects up front for endpoints that make no sense without
//! a login.

use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use domains::AppError;
use services::AuthContext;
use uuid::Uuid;

use crate::envelope::ApiError;
use crate::AppState;

pub const SESSION_COOKIE: &str = "sid";

pub(crate) fn session_token(parts: &Parts) -> Option<String> {
    let header = parts.headers.get(COOKIE)?.to_str().ok()?;
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

/// The caller, possibly anonymous.
pub struct MaybeUser(pub AuthContext);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ctx = match session_token(parts) {
            Some(token) => match state.sessions.resolve(&token).await? {
                Some(user_id) => AuthContext::for_user(user_id),
                None => AuthContext::anonymous(),
            },
            None => AuthContext::anonymous(),
        };
        Ok(MaybeUser(ctx))
    }
}

/// A logged-in caller; rejects with the fixed login guard message.
pub struct CurrentUser {
    pub user_id: Uuid,
    pub ctx: AuthContext,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let MaybeUser(ctx) = MaybeUser::from_request_parts(parts, state).await?;
        match ctx.user_id {
            Some(user_id) => Ok(CurrentUser { user_id, ctx }),
            None => Err(ApiError(AppError::Unauthorized("Please login first."))),
        }
    }
}
