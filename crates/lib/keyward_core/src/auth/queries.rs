//! Auth-related database queries.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::AuthError;
use super::store::{RefreshTokenStore, UserStore};
use crate::models::auth::{DeviceInfo, NewRefreshToken, NewUser, RefreshTokenRecord, User};
use crate::uuid::uuidv7;

/// Unique constraint on `users.username`.
pub const USERNAME_CONSTRAINT: &str = "uq_users_username";
/// Unique constraint on `users.email`.
pub const EMAIL_CONSTRAINT: &str = "uq_users_email";

/// PostgreSQL unique_violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

type UserRow = (Uuid, String, String, String, bool);

type RefreshTokenRow = (Uuid, Uuid, String, i64, i64, Option<String>, Option<String>);

/// PostgreSQL-backed user and refresh-session store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map a unique-constraint name to its domain conflict.
pub fn conflict_for_constraint(constraint: Option<&str>) -> Option<AuthError> {
    match constraint? {
        USERNAME_CONSTRAINT => Some(AuthError::UsernameAlreadyExists),
        EMAIL_CONSTRAINT => Some(AuthError::EmailAlreadyExists),
        _ => None,
    }
}

/// Translate a users-table unique violation; pass anything else through.
fn translate_user_insert_error(err: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
        && let Some(conflict) = conflict_for_constraint(db_err.constraint())
    {
        return conflict;
    }
    AuthError::DbError(err)
}

fn user_from_row((id, username, email, password_hash, active): UserRow) -> User {
    User {
        id,
        username,
        email,
        password_hash,
        active,
    }
}

fn record_from_row(
    (id, user_id, token_hash, created_at, expires_at, user_agent, ip_address): RefreshTokenRow,
) -> RefreshTokenRecord {
    RefreshTokenRecord {
        id,
        user_id,
        token_hash,
        created_at,
        expires_at,
        device_info: DeviceInfo {
            user_agent,
            ip_address,
        },
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert(&self, user: NewUser) -> Result<User, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING id, username, email, password_hash, active",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(translate_user_insert_error)?;
        Ok(user_from_row(row))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, active FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(user_from_row))
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AuthError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn set_active(&self, user_id: Uuid, active: bool) -> Result<(), AuthError> {
        let result = sqlx::query("UPDATE users SET active = $2 WHERE id = $1")
            .bind(user_id)
            .bind(active)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenStore for PgStore {
    async fn add(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord, AuthError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            "INSERT INTO refresh_tokens \
             (id, user_id, token_hash, created_at, expires_at, user_agent, ip_address) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, user_id, token_hash, created_at, expires_at, user_agent, ip_address",
        )
        .bind(uuidv7())
        .bind(token.user_id)
        .bind(&token.token_hash)
        .bind(token.created_at)
        .bind(token.expires_at)
        .bind(&token.device_info.user_agent)
        .bind(&token.device_info.ip_address)
        .fetch_one(&self.pool)
        .await?;
        Ok(record_from_row(row))
    }

    async fn exists(&self, token_hash: &str) -> Result<bool, AuthError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM refresh_tokens WHERE token_hash = $1)",
        )
        .bind(token_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<RefreshTokenRecord>, AuthError> {
        let rows = sqlx::query_as::<_, RefreshTokenRow>(
            "SELECT id, user_id, token_hash, created_at, expires_at, user_agent, ip_address \
             FROM refresh_tokens \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(record_from_row).collect())
    }

    async fn remove(&self, token_hash: &str) -> Result<bool, AuthError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
