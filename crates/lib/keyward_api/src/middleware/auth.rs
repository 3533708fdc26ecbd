//! Authentication middleware: access token extraction and current-user lookup.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use keyward_core::models::auth::User;

use crate::AppState;
use crate::error::AppError;
use crate::services::cookies::ACCESS_COOKIE;

/// The active user resolved from the request's access token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Access token from the `access_token` cookie, else `Authorization: Bearer`.
pub fn access_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(ACCESS_COOKIE)
        && !cookie.value().is_empty()
    {
        return Some(cookie.value().to_string());
    }
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Axum middleware: verifies the access token, loads the active user, and
/// injects [`CurrentUser`] into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = access_token(&jar, request.headers());
    let user = state.sessions.current_user(token.as_deref()).await?;

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}
