use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::debug;

use crate::auth::token::TokenCodec;
use crate::db::entities::user;
use crate::db::services::user_service;
use crate::web::{AppState, error::AppError};

/// Cookie that carries the session token.
pub const AUTH_COOKIE_NAME: &str = "Authorization";

/// Resolves a session token to the identity it was issued for.
///
/// The identity is re-read from the database on every call, so a deleted
/// account or a changed role takes effect on the very next request even
/// though tokens themselves are never revoked.
pub async fn resolve_identity(
    db: &DatabaseConnection,
    codec: &TokenCodec,
    token: Option<&str>,
    now: DateTime<Utc>,
) -> Result<user::Model, AppError> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthenticated("no session token presented".to_string()))?;

    let identity_id = codec
        .validate(token, now)
        .map_err(|e| AppError::Unauthenticated(format!("session token rejected: {e}")))?;

    user_service::find_user_by_id(db, identity_id)
        .await?
        .ok_or_else(|| {
            AppError::Unauthenticated(format!("identity {identity_id} no longer exists"))
        })
}

/// Tokens presented by a request, in the order they are tried: an
/// `Authorization: Bearer` header, then the `Authorization` cookie.
fn presented_tokens(headers: &HeaderMap) -> Vec<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string());
    let cookie = CookieJar::from_headers(headers)
        .get(AUTH_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string());

    let mut tokens: Vec<String> = bearer
        .into_iter()
        .chain(cookie)
        .filter(|t| !t.is_empty())
        .collect();
    tokens.dedup();
    tokens
}

/// The identity behind the current request. Taking this as a handler
/// argument makes the handler unreachable for unauthenticated requests.
///
/// A rejected header token does not shadow a valid cookie: each presented
/// token is tried in turn and the first one that resolves wins.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub user::Model);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let now = Utc::now();
        let mut rejection = None;
        for token in presented_tokens(&parts.headers) {
            let resolved =
                resolve_identity(&state.db_pool, &state.token_codec, Some(token.as_str()), now).await;
            match resolved {
                Ok(identity) => {
                    debug!(user_id = identity.id, "Resolved request identity.");
                    return Ok(CurrentUser(identity));
                }
                Err(AppError::Unauthenticated(reason)) => {
                    debug!(%reason, "Presented session token did not resolve.");
                    rejection = Some(AppError::Unauthenticated(reason));
                }
                Err(other) => return Err(other),
            }
        }

        match rejection {
            Some(err) => Err(err),
            None => resolve_identity(&state.db_pool, &state.token_codec, None, now)
                .await
                .map(CurrentUser),
        }
    }
}
