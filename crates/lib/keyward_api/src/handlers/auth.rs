//! Authentication request handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Form, Json};
use axum_extra::extract::{CookieJar, WithRejection};
use keyward_core::auth::jwt::TokenKind;
use keyward_core::auth::users::Registration;
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;
use crate::models::{
    LoginForm, LoginResponse, LogoutResponse, RefreshResponse, RegisterRequest, SessionResponse,
    UserResponse,
};
use crate::services::cookies;
use crate::services::device::ClientDevice;

const SUCCESS: &str = "Success!";

/// `POST /registration/`: create a new user account.
pub async fn register_handler(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = state
        .sessions
        .register(Registration {
            username: body.username,
            email: body.email,
            password: body.password,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// `POST /login/`: authenticate with username + password and set both
/// session cookies.
pub async fn login_handler(
    State(state): State<AppState>,
    ClientDevice(device): ClientDevice,
    jar: CookieJar,
    WithRejection(Form(form), _): WithRejection<Form<LoginForm>, AppError>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    let pair = state
        .sessions
        .login(&form.username, &form.password, device)
        .await?;

    let secure = state.config.secure_cookies;
    let jar = jar
        .add(cookies::access_cookie(
            &pair.access_token,
            state.sessions.token_lifetime(TokenKind::Access),
            secure,
        ))
        .add(cookies::refresh_cookie(
            &pair.refresh_token,
            state.sessions.token_lifetime(TokenKind::Refresh),
            secure,
        ));

    Ok((
        jar,
        Json(LoginResponse {
            sign_in: SUCCESS.into(),
        }),
    ))
}

/// `POST /refresh/`: exchange the refresh cookie for a new access cookie.
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<RefreshResponse>)> {
    let presented = jar
        .get(cookies::REFRESH_COOKIE)
        .map(|c| c.value().to_string());
    let access_token = state.sessions.refresh(presented.as_deref()).await?;

    let jar = jar.add(cookies::access_cookie(
        &access_token,
        state.sessions.token_lifetime(TokenKind::Access),
        state.config.secure_cookies,
    ));
    Ok((
        jar,
        Json(RefreshResponse {
            refresh: SUCCESS.into(),
        }),
    ))
}

/// `POST /logout/`: clear both session cookies.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<LogoutResponse>)> {
    let presented = jar
        .get(cookies::REFRESH_COOKIE)
        .map(|c| c.value().to_string());
    state.sessions.logout(presented.as_deref()).await?;

    let secure = state.config.secure_cookies;
    let jar = jar
        .add(cookies::clear_access_cookie(secure))
        .add(cookies::clear_refresh_cookie(secure));
    info!("session cookies cleared");
    Ok((
        jar,
        Json(LogoutResponse {
            logout: SUCCESS.into(),
        }),
    ))
}

/// `GET /me/`: the authenticated user.
pub async fn me_handler(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Json<UserResponse> {
    Json(user.into())
}

/// `GET /sessions/`: the authenticated user's unexpired refresh sessions.
pub async fn sessions_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> AppResult<Json<Vec<SessionResponse>>> {
    let sessions = state.sessions.sessions_of(&user).await?;
    Ok(Json(sessions.into_iter().map(SessionResponse::from).collect()))
}
