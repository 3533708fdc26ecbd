//! Route paths.

pub const POST_AUTH_REGISTRATION: &str = "/api/v1/auth/registration/";
pub const POST_AUTH_LOGIN: &str = "/api/v1/auth/login/";
pub const POST_AUTH_REFRESH: &str = "/api/v1/auth/refresh/";
pub const POST_AUTH_LOGOUT: &str = "/api/v1/auth/logout/";
pub const GET_AUTH_ME: &str = "/api/v1/auth/me/";
pub const GET_AUTH_SESSIONS: &str = "/api/v1/auth/sessions/";
