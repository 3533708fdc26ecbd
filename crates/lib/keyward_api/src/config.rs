//! API server configuration.

use keyward_core::auth::AuthError;
use keyward_core::auth::config::AuthConfig;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// Set the `Secure` attribute on session cookies.
    pub secure_cookies: bool,
    /// Token signing configuration.
    pub auth: AuthConfig,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable        | Default                             |
    /// |-----------------|-------------------------------------|
    /// | `BIND_ADDR`     | `127.0.0.1:3100`                    |
    /// | `DATABASE_URL`  | `postgres://localhost:5432/keyward` |
    /// | `COOKIE_SECURE` | `true`                              |
    /// | `AUTH_*`        | see [`AuthConfig::from_env`]        |
    pub fn from_env() -> Result<Self, AuthError> {
        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3100".into()),
            pg_connection_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/keyward".into()),
            secure_cookies: std::env::var("COOKIE_SECURE")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            auth: AuthConfig::from_env()?,
        })
    }
}
