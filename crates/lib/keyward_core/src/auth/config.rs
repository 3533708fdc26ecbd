//! Token signing configuration.
//!
//! Built once at startup and handed to [`TokenCodec::new`](super::jwt::TokenCodec::new);
//! key files are never re-read after this point.

use std::path::Path;
use std::str::FromStr;

use jsonwebtoken::Algorithm;
use tracing::info;

use super::AuthError;

/// Default access token lifetime: 15 minutes.
pub const DEFAULT_ACCESS_TOKEN_EXPIRES_SECS: i64 = 15 * 60;

/// Default refresh token lifetime: 30 days.
pub const DEFAULT_REFRESH_TOKEN_EXPIRES_DAYS: i64 = 30;

pub const SECS_IN_DAY: i64 = 60 * 60 * 24;

/// Upper bound on either token lifetime: ten years.
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 10 * 365 * SECS_IN_DAY;

/// PEM-encoded private/public key pair for one token kind.
#[derive(Clone)]
pub struct KeyPair {
    pub private_pem: String,
    pub public_pem: String,
}

impl KeyPair {
    pub fn new(private_pem: impl Into<String>, public_pem: impl Into<String>) -> Self {
        Self {
            private_pem: private_pem.into(),
            public_pem: public_pem.into(),
        }
    }

    /// Read both halves from disk.
    pub fn from_files(private_path: &Path, public_path: &Path) -> Result<Self, AuthError> {
        Ok(Self::new(read_key(private_path)?, read_key(public_path)?))
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("private_pem", &"<redacted>")
            .field("public_pem", &self.public_pem)
            .finish()
    }
}

/// Immutable signing configuration for access and refresh tokens.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub algorithm: Algorithm,
    pub access_keys: KeyPair,
    pub refresh_keys: KeyPair,
    pub access_token_expires_secs: i64,
    pub refresh_token_expires_days: i64,
    /// Delete the server-side refresh record on logout.
    pub revoke_on_logout: bool,
}

impl AuthConfig {
    /// Configuration with default lifetimes and no logout revocation.
    pub fn new(algorithm: Algorithm, access_keys: KeyPair, refresh_keys: KeyPair) -> Self {
        Self {
            algorithm,
            access_keys,
            refresh_keys,
            access_token_expires_secs: DEFAULT_ACCESS_TOKEN_EXPIRES_SECS,
            refresh_token_expires_days: DEFAULT_REFRESH_TOKEN_EXPIRES_DAYS,
            revoke_on_logout: false,
        }
    }

    /// Reads configuration from environment variables.
    ///
    /// | Variable                          | Default  |
    /// |-----------------------------------|----------|
    /// | `AUTH_ALGORITHM`                  | `RS256`  |
    /// | `AUTH_ACCESS_PRIVATE_KEY_PATH`    | required |
    /// | `AUTH_ACCESS_PUBLIC_KEY_PATH`     | required |
    /// | `AUTH_REFRESH_PRIVATE_KEY_PATH`   | required |
    /// | `AUTH_REFRESH_PUBLIC_KEY_PATH`    | required |
    /// | `AUTH_ACCESS_TOKEN_EXPIRES_SEC`   | `900`    |
    /// | `AUTH_REFRESH_TOKEN_EXPIRES_DAYS` | `30`     |
    /// | `AUTH_REVOKE_ON_LOGOUT`           | `false`  |
    pub fn from_env() -> Result<Self, AuthError> {
        let algorithm = parse_algorithm(&env_or("AUTH_ALGORITHM", "RS256"))?;

        let access_keys = KeyPair::from_files(
            Path::new(&required_env("AUTH_ACCESS_PRIVATE_KEY_PATH")?),
            Path::new(&required_env("AUTH_ACCESS_PUBLIC_KEY_PATH")?),
        )?;
        let refresh_keys = KeyPair::from_files(
            Path::new(&required_env("AUTH_REFRESH_PRIVATE_KEY_PATH")?),
            Path::new(&required_env("AUTH_REFRESH_PUBLIC_KEY_PATH")?),
        )?;

        let config = Self {
            algorithm,
            access_keys,
            refresh_keys,
            access_token_expires_secs: parse_env(
                "AUTH_ACCESS_TOKEN_EXPIRES_SEC",
                DEFAULT_ACCESS_TOKEN_EXPIRES_SECS,
            )?,
            refresh_token_expires_days: parse_env(
                "AUTH_REFRESH_TOKEN_EXPIRES_DAYS",
                DEFAULT_REFRESH_TOKEN_EXPIRES_DAYS,
            )?,
            revoke_on_logout: parse_env("AUTH_REVOKE_ON_LOGOUT", false)?,
        };
        config.validate()?;

        info!(
            algorithm = ?config.algorithm,
            access_token_expires_secs = config.access_token_expires_secs,
            refresh_token_expires_days = config.refresh_token_expires_days,
            "loaded auth configuration"
        );
        Ok(config)
    }

    /// Refresh token lifetime in seconds, or `None` if it does not fit in an `i64`.
    pub fn refresh_token_expires_secs(&self) -> Option<i64> {
        self.refresh_token_expires_days.checked_mul(SECS_IN_DAY)
    }

    /// Reject lifetimes that are non-positive or longer than
    /// [`MAX_TOKEN_LIFETIME_SECS`].
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.access_token_expires_secs <= 0 {
            return Err(AuthError::Config(
                "access token lifetime must be positive".into(),
            ));
        }
        if self.access_token_expires_secs > MAX_TOKEN_LIFETIME_SECS {
            return Err(AuthError::Config(
                "access token lifetime exceeds ten years".into(),
            ));
        }
        if self.refresh_token_expires_days <= 0 {
            return Err(AuthError::Config(
                "refresh token lifetime must be positive".into(),
            ));
        }
        match self.refresh_token_expires_secs() {
            Some(secs) if secs <= MAX_TOKEN_LIFETIME_SECS => Ok(()),
            _ => Err(AuthError::Config(
                "refresh token lifetime exceeds ten years".into(),
            )),
        }
    }
}

/// Parse a JWS algorithm name such as `RS256` or `EdDSA`.
pub fn parse_algorithm(name: &str) -> Result<Algorithm, AuthError> {
    Algorithm::from_str(name).map_err(|_| AuthError::Config(format!("unknown algorithm '{name}'")))
}

fn read_key(path: &Path) -> Result<String, AuthError> {
    std::fs::read_to_string(path)
        .map_err(|e| AuthError::Config(format!("read key {}: {e}", path.display())))
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn required_env(name: &str) -> Result<String, AuthError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AuthError::Config(format!("{name} must be set")))
}

fn parse_env<T: FromStr>(name: &str, default: T) -> Result<T, AuthError> {
    match std::env::var(name) {
        Ok(raw) if !raw.is_empty() => raw
            .parse()
            .map_err(|_| AuthError::Config(format!("{name} has invalid value '{raw}'"))),
        _ => Ok(default),
    }
}
